use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Position, UInt,
    actions::Action,
    agent::AgentState,
    config::{Site, WorldConfig, inventory},
    learning::reward::Reward,
};

/// Block counts per site, plus delivery accounting. Copied by value on every reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub pickup: HashMap<Position, UInt>,
    pub dropoff: HashMap<Position, UInt>,
    pub delivered: UInt,
}

/// Pickup-and-delivery grid. Enforces action legality and hands out rewards.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: UInt,
    height: UInt,
    initial_pickup: HashMap<Position, UInt>,
    initial_dropoff: HashMap<Position, UInt>,
    total_blocks_at_start: UInt,
    current: EnvironmentSnapshot,
}

impl GridWorld {
    pub fn new(config: &WorldConfig) -> Self {
        let initial_pickup = inventory(&config.pickup_sites);
        let initial_dropoff = inventory(&config.dropoff_sites);
        let total_blocks_at_start = initial_pickup.values().sum();
        GridWorld {
            width: config.width,
            height: config.height,
            current: EnvironmentSnapshot {
                pickup: initial_pickup.clone(),
                dropoff: initial_dropoff.clone(),
                delivered: 0,
            },
            initial_pickup,
            initial_dropoff,
            total_blocks_at_start,
        }
    }

    pub fn width(&self) -> UInt {
        self.width
    }

    pub fn height(&self) -> UInt {
        self.height
    }

    pub fn pickup(&self) -> &HashMap<Position, UInt> {
        &self.current.pickup
    }

    pub fn dropoff(&self) -> &HashMap<Position, UInt> {
        &self.current.dropoff
    }

    pub fn delivered(&self) -> UInt {
        self.current.delivered
    }

    pub fn total_blocks_at_start(&self) -> UInt {
        self.total_blocks_at_start
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.current.clone()
    }

    fn in_bounds(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Destination of a move if it stays on the grid and off the other agent.
    fn destination(
        &self,
        agent: &AgentState,
        other: &AgentState,
        action: Action,
    ) -> Option<Position> {
        let (dx, dy) = action.delta()?;
        agent
            .position
            .offset(dx, dy)
            .filter(|p| self.in_bounds(*p) && *p != other.position)
    }

    fn can_pickup(&self, agent: &AgentState) -> bool {
        !agent.carrying
            && self
                .current
                .pickup
                .get(&agent.position)
                .is_some_and(|&count| count > 0)
    }

    fn can_dropoff(&self, agent: &AgentState) -> bool {
        agent.carrying && self.current.dropoff.contains_key(&agent.position)
    }

    /// Actions `agent` may take right now. Empty when it is trapped.
    pub fn legal_actions(&self, agent: &AgentState, other: &AgentState) -> Vec<Action> {
        let mut possible: Vec<Action> = Action::moves()
            .filter(|&a| self.destination(agent, other, a).is_some())
            .collect();
        if self.can_pickup(agent) {
            possible.push(Action::Pickup);
        }
        if self.can_dropoff(agent) {
            possible.push(Action::Dropoff);
        }
        possible
    }

    /// Attempt `action` for `agent` and return its reward. Illegal attempts are
    /// penalized and leave every piece of state unchanged.
    pub fn apply_action(
        &mut self,
        agent: &mut AgentState,
        other: &AgentState,
        action: Action,
    ) -> Reward {
        match action {
            Action::North | Action::South | Action::East | Action::West => {
                match self.destination(agent, other, action) {
                    Some(position) => {
                        agent.position = position;
                        Reward::step()
                    }
                    None => Reward::penalty(),
                }
            }
            Action::Pickup => {
                if !self.can_pickup(agent) {
                    return Reward::penalty();
                }
                if let Some(count) = self.current.pickup.get_mut(&agent.position) {
                    *count -= 1;
                }
                agent.carrying = true;
                Reward::transfer()
            }
            Action::Dropoff => {
                if !self.can_dropoff(agent) {
                    return Reward::penalty();
                }
                if let Some(count) = self.current.dropoff.get_mut(&agent.position) {
                    *count += 1;
                }
                agent.carrying = false;
                self.current.delivered += 1;
                Reward::transfer()
            }
        }
    }

    /// Restore both inventories from the initial layout. Agents are not moved.
    pub fn reset(&mut self) {
        self.current = EnvironmentSnapshot {
            pickup: self.initial_pickup.clone(),
            dropoff: self.initial_dropoff.clone(),
            delivered: 0,
        };
    }

    /// Replace the pickup layout mid-run. Starts a new task: the delivery target is
    /// recomputed and progress toward the old one is dropped. Dropoff counts and
    /// agents are kept as they are.
    pub fn change_configuration(&mut self, pickup_sites: &[Site]) {
        self.initial_pickup = inventory(pickup_sites);
        self.current.pickup = self.initial_pickup.clone();
        self.total_blocks_at_start = self.initial_pickup.values().sum();
        self.current.delivered = 0;
        info!(
            "World change: pickup sites now {:?}, {} blocks to deliver",
            pickup_sites, self.total_blocks_at_start
        );
    }

    pub fn is_terminal(&self) -> bool {
        self.current.delivered == self.total_blocks_at_start
    }
}
