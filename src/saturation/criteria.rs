use crate::utils::toml_config::ConfigError;
use serde::{Deserialize, Serialize};

/// Static per-branch thresholds for the saturation verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationCriteria {
    /// Duplicate rate at or above which the duplicate condition holds (default: 0.8)
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    /// Novelty at or below which the novelty condition holds (default: 0.2)
    #[serde(default = "default_novelty_threshold")]
    pub novelty_threshold: f64,

    /// Source overlap at or above which the overlap condition holds (default: 0.7)
    #[serde(default = "default_source_overlap_limit")]
    pub source_overlap_limit: f64,

    /// Results that must be processed before a stop verdict is permitted (default: 5)
    #[serde(default = "default_min_results")]
    pub min_results: usize,

    /// Results after which the result-cap condition holds (default: 50)
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Information gain at or below which the gain condition holds (default: 0.1)
    #[serde(default = "default_information_gain_threshold")]
    pub information_gain_threshold: f64,
}

fn default_duplicate_threshold() -> f64 {
    0.8
}

fn default_novelty_threshold() -> f64 {
    0.2
}

fn default_source_overlap_limit() -> f64 {
    0.7
}

fn default_min_results() -> usize {
    5
}

fn default_max_results() -> usize {
    50
}

fn default_information_gain_threshold() -> f64 {
    0.1
}

impl Default for SaturationCriteria {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            novelty_threshold: default_novelty_threshold(),
            source_overlap_limit: default_source_overlap_limit(),
            min_results: default_min_results(),
            max_results: default_max_results(),
            information_gain_threshold: default_information_gain_threshold(),
        }
    }
}

impl SaturationCriteria {
    pub fn with_result_bounds(mut self, min_results: usize, max_results: usize) -> Self {
        self.min_results = min_results;
        self.max_results = max_results;
        self
    }

    pub fn with_duplicate_threshold(mut self, threshold: f64) -> Self {
        self.duplicate_threshold = threshold;
        self
    }

    pub fn with_novelty_threshold(mut self, threshold: f64) -> Self {
        self.novelty_threshold = threshold;
        self
    }

    pub fn with_source_overlap_limit(mut self, limit: f64) -> Self {
        self.source_overlap_limit = limit;
        self
    }

    pub fn with_information_gain_threshold(mut self, threshold: f64) -> Self {
        self.information_gain_threshold = threshold;
        self
    }

    /// Check that every threshold is a rate and the result bounds are ordered
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("duplicate_threshold", self.duplicate_threshold),
            ("novelty_threshold", self.novelty_threshold),
            ("source_overlap_limit", self.source_overlap_limit),
            ("information_gain_threshold", self.information_gain_threshold),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "saturation.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.min_results > self.max_results {
            return Err(ConfigError::ValidationError(format!(
                "saturation.min_results ({}) exceeds max_results ({})",
                self.min_results, self.max_results
            )));
        }

        Ok(())
    }
}
