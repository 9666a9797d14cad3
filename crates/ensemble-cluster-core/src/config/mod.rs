//! Configuration management for the ensemble clustering pipeline.
//!
//! Configuration is validated twice, both times before any computation:
//! [`PipelineConfig::validate`] checks value ranges,
//! [`PipelineConfig::validate_for`] checks the values against the shape of
//! the data about to be processed.

pub mod constants;
mod sub_configs;

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};

pub use sub_configs::{ConsensusConfig, ContrastConfig, HierarchyConfig, InputConfig, MergeConfig};

/// Environment variable selecting the environment-specific config file.
pub const ENV_VAR: &str = "ENSEMBLE_CLUSTER_ENV";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "ENSEMBLE_CLUSTER";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub consensus: ConsensusConfig,
    pub hierarchy: HierarchyConfig,
    pub merge: MergeConfig,
    pub contrast: ContrastConfig,
}

impl PipelineConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{ENSEMBLE_CLUSTER_ENV}.toml (environment-specific)
    /// 3. Environment variables with ENSEMBLE_CLUSTER__ prefix
    pub fn load() -> EnsembleResult<Self> {
        let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> EnsembleResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EnsembleError::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> EnsembleResult<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` naming the first offending field.
    pub fn validate(&self) -> EnsembleResult<()> {
        self.consensus.validate()?;
        self.hierarchy.validate()?;
        self.merge.validate()?;
        self.contrast.validate()
    }

    /// Validate against the number of samples about to be processed.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` when `combine_min_size` or
    /// `target_clusters` exceed the sample count.
    pub fn validate_for(&self, n_samples: usize) -> EnsembleResult<()> {
        self.validate()?;
        self.consensus.validate_for(n_samples)
    }
}
