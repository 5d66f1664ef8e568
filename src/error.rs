use thiserror::Error;

use crate::Position;

/// Problems with an experiment or world definition. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Policy schedule of experiment '{0}' is empty")]
    EmptySchedule(String),

    #[error(
        "Position ({}, {}) is out of bounds for grid size ({width}, {height})",
        .position.x,
        .position.y
    )]
    OutOfBounds {
        position: Position,
        width: u32,
        height: u32,
    },

    #[error("Position ({}, {}) is both a pickup and a dropoff site", .0.x, .0.y)]
    OverlappingSites(Position),

    #[error("Position ({}, {}) is listed more than once", .0.x, .0.y)]
    DuplicateSite(Position),

    #[error("Pickup site ({}, {}) holds no blocks", .0.x, .0.y)]
    EmptyPickupSite(Position),

    #[error("Pickup layout holds no blocks to deliver")]
    NoBlocks,

    #[error("Experiment name '{0}' must be non-empty and free of path separators")]
    InvalidName(String),

    #[error("Both agents start at ({}, {})", .0.x, .0.y)]
    SharedStart(Position),

    #[error("{name} must lie in [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f32 },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
