use serde::{Deserialize, Serialize};

use crate::{Int, MOVE_REWARD, PENALTY_REWARD, TRANSFER_REWARD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub val: Int,
}

impl Reward {
    pub fn new(val: Int) -> Self {
        Reward { val }
    }

    /// A successful move.
    pub fn step() -> Self {
        Reward::new(MOVE_REWARD)
    }

    /// A successful pickup or dropoff.
    pub fn transfer() -> Self {
        Reward::new(TRANSFER_REWARD)
    }

    /// Any illegal attempt.
    pub fn penalty() -> Self {
        Reward::new(PENALTY_REWARD)
    }

    pub fn as_f32(&self) -> f32 {
        self.val as f32
    }
}
