//! # A.R.E.S Dispatch - Adaptive Search Dispatch & Termination
//!
//! The decision engine behind A.R.E.S research branches. It decides which
//! search backends to query in each round, and when a branch has stopped
//! yielding new information.
//!
//! The engine performs no network I/O. It consumes a roster of
//! [`BackendDescriptor`]s and batches of [`ResultRecord`]s produced by
//! external backend clients, and emits selections and verdicts.
//!
//! ## Quick Start
//!
//! ```rust
//! use ares_dispatch::{
//!     BackendDescriptor, DispatchRequest, EngineConfig, Recommendation, ResearchBranch,
//!     ResultRecord,
//! };
//!
//! let mut branch = ResearchBranch::new("vector databases", EngineConfig::default()).unwrap();
//! let roster = vec![
//!     BackendDescriptor::new("web", 5),
//!     BackendDescriptor::new("arxiv", 8).with_reliability(0.95),
//!     BackendDescriptor::new("github", 3),
//! ];
//!
//! let backends = branch.plan_round(&roster, &DispatchRequest::new().with_max_sources(2));
//! assert_eq!(backends.len(), 2);
//!
//! // ... query the backends through their clients ...
//! for backend in &backends {
//!     branch.complete_backend(&backend.name, true);
//! }
//!
//! let mut batch = vec![ResultRecord::new(
//!     "https://example.com/hnsw",
//!     "arxiv",
//!     "HNSW graphs for vector databases",
//!     0.85,
//! )];
//! let report = branch.complete_round(&mut batch);
//! assert_eq!(report.recommendation, Recommendation::Continue);
//! ```
//!
//! ## Modules
//!
//! - [`dispatch`] - Backend selection strategies and connection bookkeeping
//! - [`saturation`] - Multi-metric saturation detection
//! - [`research`] - Per-branch pairing of dispatcher and detector
//! - [`types`] - Backend, request and result types, errors
//! - [`utils`] - TOML configuration

#![warn(rustdoc::missing_crate_level_docs)]

/// Backend selection and load balancing.
pub mod dispatch;
/// Research branch unit of work.
pub mod research;
/// Saturation detection.
pub mod saturation;
/// Core types (backends, results, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use dispatch::{DispatcherStats, LoadBalancer, LoadBalancingConfig, SelectionStrategy};
pub use research::ResearchBranch;
pub use saturation::{
    Recommendation, SaturationCriteria, SaturationDetector, SaturationMetrics, SaturationReport,
    SearchStats,
};
pub use types::{AppError, BackendDescriptor, DispatchRequest, Result, ResultRecord};
pub use utils::toml_config::{ConfigError, EngineConfig};
