use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid checker configuration: {0}")]
    Invalid(String),
    #[error("Failed to parse checker configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tuning knobs of the pattern sampler and the subset checker.
///
/// Every field has a default, so a configuration document only needs to list
/// the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Unique samples drawn per pattern-inclusion check.
    pub pattern_sample_count: usize,
    /// Extra repetitions allowed beyond a quantifier's minimum.
    pub max_repeat: u32,
    /// Generated samples longer than this (in chars) are discarded.
    pub max_sample_length: usize,
    /// Attempts budget as a multiple of `pattern_sample_count`.
    pub attempts_factor: usize,
    /// Seed of the sampling RNG; fixed so verdicts are reproducible.
    pub sample_seed: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            pattern_sample_count: 200,
            max_repeat: 20,
            max_sample_length: 100,
            attempts_factor: 3,
            sample_seed: 0x5EED_CAFE,
        }
    }
}

impl CheckerConfig {
    /// Builds a configuration from a JSON document, filling gaps with defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the document has the wrong shape or fails
    /// [`CheckerConfig::validate`].
    pub fn from_value(data: Value) -> Result<Self, ConfigError> {
        let cfg: CheckerConfig = serde_json::from_value(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` when a count or length is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern_sample_count == 0 {
            return Err(ConfigError::Invalid(
                "pattern_sample_count must be positive".to_owned(),
            ));
        }
        if self.max_sample_length == 0 {
            return Err(ConfigError::Invalid(
                "max_sample_length must be positive".to_owned(),
            ));
        }
        if self.attempts_factor == 0 {
            return Err(ConfigError::Invalid(
                "attempts_factor must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
