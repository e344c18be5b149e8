//! Simulation parameters for an [`Organism`](crate::organism::Organism).

use serde::{Deserialize, Serialize};
use transsys_core::error::{ConfigError, Result, TranssysError};

/// Tunable parameters of an organism run.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```toml
/// rng_seed = 7
/// timesteps_per_derivation = 5
/// max_string_length = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the run's random number generator (default: 1).
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
    /// Expression/diffusion ticks between two derivations (default: 1).
    #[serde(default = "default_timesteps")]
    pub timesteps_per_derivation: usize,
    /// Whether contacting symbols exchange factors (default: true).
    #[serde(default = "default_diffusion")]
    pub diffusion: bool,
    /// Longest string a derivation may produce (default: unbounded).
    #[serde(default)]
    pub max_string_length: Option<usize>,
}

fn default_rng_seed() -> u64 { 1 }
fn default_timesteps() -> usize { 1 }
fn default_diffusion() -> bool { true }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rng_seed: default_rng_seed(),
            timesteps_per_derivation: default_timesteps(),
            diffusion: default_diffusion(),
            max_string_length: None,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timesteps_per_derivation == 0 {
            return Err(ConfigError::OutOfRange {
                field: "timesteps_per_derivation".into(),
                min: 1.0,
                max: f64::INFINITY,
                value: 0.0,
            }
            .into());
        }
        if self.max_string_length == Some(0) {
            return Err(TranssysError::invalid_config(
                "max_string_length",
                "0",
                "no generation fits in an empty string",
            ));
        }
        Ok(())
    }
}
