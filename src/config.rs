use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    Position, UInt,
    error::ConfigError,
    learning::{Algorithm, policy::Policy},
};

/// A pickup or dropoff cell together with its block count. Dropoff sites may omit the
/// count, pickup sites must hold at least one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub x: UInt,
    pub y: UInt,
    #[serde(default)]
    pub count: UInt,
}

impl Site {
    pub fn new(x: UInt, y: UInt, count: UInt) -> Self {
        Site { x, y, count }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Turn a list of sites into an inventory keyed by position.
pub fn inventory(sites: &[Site]) -> HashMap<Position, UInt> {
    sites.iter().map(|s| (s.position(), s.count)).collect()
}

fn check_unique(sites: &[Site]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    match sites.iter().map(Site::position).find(|p| !seen.insert(*p)) {
        Some(position) => Err(ConfigError::DuplicateSite(position)),
        None => Ok(()),
    }
}

/// Immutable description of the grid a run starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: UInt,
    pub height: UInt,
    pub pickup_sites: Vec<Site>,
    pub dropoff_sites: Vec<Site>,
    /// Fixed start cells of agent F and agent M.
    pub starts: [Position; 2],
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            width: 5,
            height: 5,
            pickup_sites: vec![Site::new(1, 2, 5), Site::new(3, 3, 5)],
            dropoff_sites: vec![
                Site::new(0, 0, 0),
                Site::new(0, 4, 0),
                Site::new(2, 2, 0),
                Site::new(4, 3, 0),
            ],
            starts: [Position::new(0, 2), Position::new(4, 2)],
        }
    }
}

impl WorldConfig {
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    fn check_in_bounds(&self, position: Position) -> Result<(), ConfigError> {
        if self.contains(position) {
            Ok(())
        } else {
            Err(ConfigError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Check a pickup layout against this grid. Every site needs a block, so a fresh
    /// layout is never terminal.
    pub fn validate_pickups(&self, pickup_sites: &[Site]) -> Result<(), ConfigError> {
        if pickup_sites.is_empty() {
            return Err(ConfigError::NoBlocks);
        }
        check_unique(pickup_sites)?;
        for site in pickup_sites {
            self.check_in_bounds(site.position())?;
            if site.count == 0 {
                return Err(ConfigError::EmptyPickupSite(site.position()));
            }
            if self
                .dropoff_sites
                .iter()
                .any(|d| d.position() == site.position())
            {
                return Err(ConfigError::OverlappingSites(site.position()));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pickups(&self.pickup_sites)?;
        check_unique(&self.dropoff_sites)?;
        for site in &self.dropoff_sites {
            self.check_in_bounds(site.position())?;
        }
        for start in &self.starts {
            self.check_in_bounds(*start)?;
        }
        if self.starts[0] == self.starts[1] {
            return Err(ConfigError::SharedStart(self.starts[0]));
        }
        Ok(())
    }
}

/// One leg of a policy schedule: `policy` is in effect for `steps` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub steps: UInt,
    pub policy: Policy,
}

/// Mid-run change of the pickup layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconfiguration {
    /// Fires once, when this many terminal states have been reached.
    pub after_terminal_states: UInt,
    pub pickup_sites: Vec<Site>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub total_steps: UInt,
    pub algorithm: Algorithm,
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub policy_schedule: Vec<ScheduleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconfigure: Option<Reconfiguration>,
    #[serde(default)]
    pub visualize_paths: bool,
}

impl ExperimentConfig {
    /// An experiment with a single policy for the whole run.
    pub fn new(name: &str, total_steps: UInt, algorithm: Algorithm, policy: Policy) -> Self {
        ExperimentConfig {
            name: name.to_string(),
            total_steps,
            algorithm,
            learning_rate: 0.3,
            discount_factor: 0.5,
            policy_schedule: vec![ScheduleEntry {
                steps: total_steps,
                policy,
            }],
            seed: None,
            reconfigure: None,
            visualize_paths: false,
        }
    }

    pub fn validate(&self, world: &WorldConfig) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        if self.policy_schedule.is_empty() {
            return Err(ConfigError::EmptySchedule(self.name.clone()));
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        if let Some(reconfigure) = &self.reconfigure {
            world.validate_pickups(&reconfigure.pickup_sites)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    pub experiments: Vec<ExperimentConfig>,
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        for experiment in &self.experiments {
            experiment.validate(&self.world)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization_toml() {
        let config = Config {
            world: WorldConfig::default(),
            experiments: vec![ExperimentConfig::new(
                "random",
                100,
                Algorithm::QLearning,
                Policy::PRandom,
            )],
        };
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("algorithm = \"Q_LEARNING\""));
        assert!(serialized.contains("policy = \"PRANDOM\""));

        let deserialized = Config::from_toml(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_read_from_file() {
        let config = Config::load("./pdworld.toml").expect("Failed to read the file");
        assert!(!config.experiments.is_empty());
        assert_eq!(config.world, WorldConfig::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let s = r#"
            [[experiments]]
            name = "bad"
            total_steps = 10
            algorithm = "SARSA"
            learning_rate = 0.3
            discount_factor = 0.5
            policy_schedule = [{ steps = 10, policy = "PLAZY" }]
        "#;
        let err = Config::from_toml(s).unwrap_err();
        assert!(err.to_string().contains("Unknown policy: PLAZY"));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let s = r#"
            [[experiments]]
            name = "bad"
            total_steps = 10
            algorithm = "TD_LAMBDA"
            learning_rate = 0.3
            discount_factor = 0.5
            policy_schedule = [{ steps = 10, policy = "PGREEDY" }]
        "#;
        let err = Config::from_toml(s).unwrap_err();
        assert!(err.to_string().contains("Unknown algorithm: TD_LAMBDA"));
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let mut experiment = ExperimentConfig::new("x", 10, Algorithm::Sarsa, Policy::PGreedy);
        experiment.policy_schedule.clear();
        assert!(matches!(
            experiment.validate(&WorldConfig::default()),
            Err(ConfigError::EmptySchedule(_))
        ));
    }

    #[test]
    fn test_rate_out_of_range() {
        let mut experiment = ExperimentConfig::new("x", 10, Algorithm::Sarsa, Policy::PGreedy);
        experiment.learning_rate = 1.5;
        assert!(matches!(
            experiment.validate(&WorldConfig::default()),
            Err(ConfigError::RateOutOfRange {
                name: "learning_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_world_validation() {
        let mut world = WorldConfig::default();
        world.pickup_sites.push(Site::new(5, 0, 1));
        assert!(matches!(
            world.validate(),
            Err(ConfigError::OutOfBounds { .. })
        ));

        let mut world = WorldConfig::default();
        world.pickup_sites.push(Site::new(2, 2, 1));
        assert!(matches!(
            world.validate(),
            Err(ConfigError::OverlappingSites(_))
        ));

        let mut world = WorldConfig::default();
        world.starts[1] = world.starts[0];
        assert!(matches!(world.validate(), Err(ConfigError::SharedStart(_))));
    }

    #[test]
    fn test_pickup_without_count_rejected() {
        let s = r#"
            experiments = []

            [world]
            pickup_sites = [{ x = 1, y = 2 }, { x = 3, y = 3 }]
        "#;
        assert!(matches!(
            Config::from_toml(s),
            Err(ConfigError::EmptyPickupSite(p)) if p == Position::new(1, 2)
        ));
    }

    #[test]
    fn test_dropoff_without_count_accepted() {
        let s = r#"
            experiments = []

            [world]
            dropoff_sites = [{ x = 0, y = 0 }, { x = 4, y = 4 }]
        "#;
        let config = Config::from_toml(s).unwrap();
        assert_eq!(config.world.dropoff_sites[1], Site::new(4, 4, 0));
    }

    #[test]
    fn test_no_blocks_rejected() {
        let world = WorldConfig {
            pickup_sites: vec![],
            ..WorldConfig::default()
        };
        assert!(matches!(world.validate(), Err(ConfigError::NoBlocks)));
    }

    #[test]
    fn test_duplicate_sites_rejected() {
        let mut world = WorldConfig::default();
        world.pickup_sites.push(Site::new(1, 2, 5));
        assert!(matches!(
            world.validate(),
            Err(ConfigError::DuplicateSite(p)) if p == Position::new(1, 2)
        ));

        let mut world = WorldConfig::default();
        world.dropoff_sites.push(Site::new(0, 0, 0));
        assert!(matches!(
            world.validate(),
            Err(ConfigError::DuplicateSite(p)) if p == Position::new(0, 0)
        ));
    }

    #[test]
    fn test_reconfiguration_layout_checked() {
        let world = WorldConfig::default();
        let mut experiment = ExperimentConfig::new("x", 10, Algorithm::Sarsa, Policy::PGreedy);
        for (sites, expected) in [
            (vec![Site::new(1, 2, 0)], "Pickup site (1, 2) holds no blocks"),
            (vec![], "Pickup layout holds no blocks to deliver"),
            (
                vec![Site::new(4, 4, 5), Site::new(4, 4, 5)],
                "Position (4, 4) is listed more than once",
            ),
        ] {
            experiment.reconfigure = Some(Reconfiguration {
                after_terminal_states: 3,
                pickup_sites: sites,
            });
            let err = experiment.validate(&world).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_experiment_name_must_be_a_file_name() {
        let world = WorldConfig::default();
        for name in ["", "runs/exp_1", "..\\exp"] {
            let experiment = ExperimentConfig::new(name, 10, Algorithm::Sarsa, Policy::PGreedy);
            assert!(matches!(
                experiment.validate(&world),
                Err(ConfigError::InvalidName(_))
            ));
        }
        let experiment = ExperimentConfig::new("Exp_1a", 10, Algorithm::Sarsa, Policy::PGreedy);
        assert!(experiment.validate(&world).is_ok());
    }

    #[test]
    fn test_inventory() {
        let inv = inventory(&WorldConfig::default().pickup_sites);
        assert_eq!(inv.get(&Position::new(1, 2)), Some(&5));
        assert_eq!(inv.values().sum::<UInt>(), 10);
    }
}
