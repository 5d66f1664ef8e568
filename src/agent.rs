use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Position;

/// Mutable record of one agent on the grid. Only `GridWorld` moves it during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    pub position: Position,
    pub carrying: bool,
}

impl AgentState {
    pub fn new(name: &str, position: Position) -> Self {
        AgentState {
            name: name.to_string(),
            position,
            carrying: false,
        }
    }

    /// Place the agent back on `start` with empty hands.
    pub fn reset(&mut self, start: Position) {
        self.position = start;
        self.carrying = false;
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Agent {} at ({}, {}), holding: {}",
            self.name, self.position.x, self.position.y, self.carrying
        )
    }
}
