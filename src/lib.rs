use serde::{Deserialize, Serialize};

pub mod actions;
pub mod agent;
pub mod config;
pub mod error;
pub mod learning;
pub mod report;
pub mod simulation;
pub mod world;

pub type Int = i32;
pub type UInt = u32;

pub const MOVE_REWARD: Int = -1;
pub const PENALTY_REWARD: Int = -10;
pub const TRANSFER_REWARD: Int = 13;

/// A cell on the grid, `(0, 0)` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: UInt,
    pub y: UInt,
}

impl Position {
    pub fn new(x: UInt, y: UInt) -> Self {
        Position { x, y }
    }

    /// Shift by `(dx, dy)`, returning `None` on underflow or overflow.
    pub fn offset(&self, dx: Int, dy: Int) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn manhattan(&self, other: &Position) -> UInt {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(UInt, UInt)> for Position {
    fn from(pair: (UInt, UInt)) -> Self {
        Position::new(pair.0, pair.1)
    }
}
