//! TOML-based configuration for the dispatch engine
//!
//! This module provides declarative configuration for the load balancer and
//! the saturation detector via a TOML file (`dispatch.toml`). Every field has
//! a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [load_balancing]
//! strategy = "least_connections"
//! health_check_interval_secs = 30
//! failover_threshold = 3
//!
//! [load_balancing.weighting]
//! recency_bonus = 1.2
//! recency_window_ms = 60000
//!
//! [saturation]
//! duplicate_threshold = 0.8
//! min_results = 5
//! max_results = 50
//! ```
//!
//! Configuration is read once when a research branch is built and is not
//! reloaded mid-run.

use crate::dispatch::LoadBalancingConfig;
use crate::saturation::SaturationCriteria;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from dispatch.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub load_balancing: LoadBalancingConfig,

    #[serde(default)]
    pub saturation: SaturationCriteria,
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;

        tracing::info!(
            path = %path.display(),
            strategy = %config.load_balancing.strategy,
            "Loaded dispatch configuration"
        );

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lb = &self.load_balancing;

        if lb.failover_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "load_balancing.failover_threshold must be at least 1".to_string(),
            ));
        }

        if lb.health_check_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "load_balancing.health_check_interval_secs must be positive".to_string(),
            ));
        }

        let factors = [
            ("recency_bonus", lb.weighting.recency_bonus),
            ("load_penalty", lb.weighting.load_penalty),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "load_balancing.weighting.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        self.saturation.validate()
    }
}
