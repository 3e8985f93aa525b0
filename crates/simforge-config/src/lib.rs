//! Simulation configuration, loadable from TOML or YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// What a trajectory does when a state-action constraint fails after a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintPolicy {
    /// Report violations in the step outcome and keep going.
    #[default]
    Record,
    /// Report violations and terminate the trajectory.
    Abort,
}

/// Knobs for the trajectory driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Seed for the per-trajectory random source; a fresh OS seed when
    /// absent.
    pub random_seed: Option<u64>,
    pub constraint_policy: ConstraintPolicy,
    /// Tolerance for the sum-to-one check on `Discrete` outcome
    /// probabilities.
    pub probability_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            constraint_policy: ConstraintPolicy::default(),
            probability_tolerance: 1e-6,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_constraint_policy(mut self, policy: ConstraintPolicy) -> Self {
        self.constraint_policy = policy;
        self
    }

    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.probability_tolerance.is_finite() || self.probability_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "probability_tolerance {} must be finite and non-negative",
                self.probability_tolerance
            )));
        }
        Ok(())
    }
}
