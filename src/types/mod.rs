use crate::utils::toml_config::ConfigError;
use serde::{Deserialize, Serialize};

/// Reliability assumed for a backend whose health monitor has not reported yet.
pub const DEFAULT_RELIABILITY: f64 = 0.8;

/// Number of backends selected per round when the request does not say.
pub const DEFAULT_MAX_SOURCES: usize = 3;

// ============= Backend Types =============

/// One search/data source available for dispatch.
///
/// `priority` is fixed by configuration. `reliability` is refreshed between
/// rounds by an external health monitor and is never mutated by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f64>,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            priority,
            reliability: None,
        }
    }

    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = Some(reliability);
        self
    }

    /// Reliability used for health ranking, `0.8` when unset.
    pub fn effective_reliability(&self) -> f64 {
        self.reliability.unwrap_or(DEFAULT_RELIABILITY)
    }
}

/// Per-round dispatch context supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Explicit allow-list of backend names (user override)
    #[serde(default)]
    pub requested_sources: Vec<String>,
    /// Upper bound on backends selected this round (default: 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources: Option<usize>,
}

impl DispatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources = Some(max);
        self
    }

    pub fn effective_max_sources(&self) -> usize {
        self.max_sources.unwrap_or(DEFAULT_MAX_SOURCES)
    }
}

// ============= Result Types =============

/// One item returned by a backend during a round.
///
/// `content_fingerprint` and `novelty_score` are filled in by the saturation
/// detector; callers leave them at their defaults. A missing `raw_content`
/// deserializes as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub identifier: String,
    pub source_name: String,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_fingerprint: Option<String>,
    #[serde(default)]
    pub novelty_score: f64,
}

impl ResultRecord {
    pub fn new(
        identifier: impl Into<String>,
        source_name: impl Into<String>,
        raw_content: impl Into<String>,
        relevance_score: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            source_name: source_name.into(),
            raw_content: raw_content.into(),
            relevance_score,
            content_fingerprint: None,
            novelty_score: 0.0,
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
