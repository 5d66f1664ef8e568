use serde::{Deserialize, Serialize};

use crate::{Position, UInt, agent::AgentState};

/// Agent-centric key of the value table. The other agent's carrying flag is not observed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PerceivedState {
    pub x: UInt,
    pub y: UInt,
    pub carrying: bool,
    pub other_x: UInt,
    pub other_y: UInt,
}

impl PerceivedState {
    pub fn new(own: Position, carrying: bool, other: Position) -> Self {
        PerceivedState {
            x: own.x,
            y: own.y,
            carrying,
            other_x: other.x,
            other_y: other.y,
        }
    }

    pub fn observe(agent: &AgentState, other: &AgentState) -> Self {
        PerceivedState::new(agent.position, agent.carrying, other.position)
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn other_position(&self) -> Position {
        Position::new(self.other_x, self.other_y)
    }
}
