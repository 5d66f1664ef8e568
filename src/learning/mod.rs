use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::ConfigError;

pub mod controller;
pub mod perceived_state;
pub mod policy;
pub mod q_table;
pub mod reward;

/// Value-update rule applied after each action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Off-policy: bootstrap from the best next action.
    #[strum(serialize = "Q_LEARNING")]
    QLearning,
    /// On-policy: bootstrap from the next action actually chosen.
    #[strum(serialize = "SARSA")]
    Sarsa,
}

impl TryFrom<String> for Algorithm {
    type Error = ConfigError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse().map_err(|_| ConfigError::UnknownAlgorithm(name))
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.to_string()
    }
}
