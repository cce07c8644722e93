//! Saturation Detection
//!
//! Decides when a research branch has stopped yielding useful new
//! information.
//!
//! # Metrics
//!
//! Each round produces a [`metrics::SaturationMetrics`]:
//! - **duplicate rate** - share of the batch already seen by identifier or content
//! - **novelty** - content length and target keyword coverage
//! - **source overlap** - share of the batch's sources already used
//! - **information gain** - relevance trend of the most recent results
//! - **search efficiency** - share of results both relevant and novel
//!
//! A branch is saturated once any two conditions from
//! [`criteria::SaturationCriteria`] hold and enough results have been
//! processed. The result cap counts as one of the conditions.
//!
//! # Usage
//!
//! ```rust
//! use ares_dispatch::saturation::{Recommendation, SaturationCriteria, SaturationDetector};
//! use ares_dispatch::types::ResultRecord;
//!
//! let mut detector = SaturationDetector::new(SaturationCriteria::default());
//! let mut batch = vec![ResultRecord::new(
//!     "https://example.com/paper",
//!     "arxiv",
//!     "Survey of retrieval augmented generation",
//!     0.9,
//! )];
//!
//! let report = detector.detect_saturation(&mut batch, "retrieval augmented generation");
//! assert_ne!(report.recommendation, Recommendation::Stop);
//! ```

/// Per-branch saturation thresholds.
pub mod criteria;
/// Cross-round saturation state and verdicts.
pub mod detector;
/// Metric computations.
pub mod metrics;

pub use criteria::SaturationCriteria;
pub use detector::{
    Recommendation, SaturationDetector, SaturationReport, SaturationSignal, SearchStats,
};
pub use metrics::SaturationMetrics;
