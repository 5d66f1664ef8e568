use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::ConfigError;

/// Probability that `PExploit` follows the best known action.
pub const EXPLOIT_PROBABILITY: f64 = 0.8;

/// Action-selection rule in effect at a given step, independent of the update rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[serde(try_from = "String", into = "String")]
pub enum Policy {
    #[strum(serialize = "PRANDOM")]
    PRandom,
    #[strum(serialize = "PGREEDY")]
    PGreedy,
    #[strum(serialize = "PEXPLOIT")]
    PExploit,
}

impl TryFrom<String> for Policy {
    type Error = ConfigError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse().map_err(|_| ConfigError::UnknownPolicy(name))
    }
}

impl From<Policy> for String {
    fn from(policy: Policy) -> Self {
        policy.to_string()
    }
}
