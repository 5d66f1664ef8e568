use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

use crate::Int;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
    EnumString,
    Display,
)]
pub enum Action {
    North,
    South,
    East,
    West,
    Pickup,
    Dropoff,
}

impl Action {
    /// The four movement actions, in enumeration order.
    pub fn moves() -> impl Iterator<Item = Action> {
        Action::iter().filter(Action::is_move)
    }

    pub fn is_move(&self) -> bool {
        self.delta().is_some()
    }

    /// Grid displacement of a movement action. North decreases `y`.
    pub fn delta(&self) -> Option<(Int, Int)> {
        match self {
            Action::North => Some((0, -1)),
            Action::South => Some((0, 1)),
            Action::East => Some((1, 0)),
            Action::West => Some((-1, 0)),
            Action::Pickup | Action::Dropoff => None,
        }
    }

    /// Slot of this action in a value-table row.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn arrow(&self) -> char {
        match self {
            Action::North => '^',
            Action::South => 'v',
            Action::East => '>',
            Action::West => '<',
            Action::Pickup => 'P',
            Action::Dropoff => 'D',
        }
    }
}
