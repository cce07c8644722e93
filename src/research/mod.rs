//! Research Branches
//!
//! A branch is one independent line of iterative research. It pairs a
//! [`crate::dispatch::LoadBalancer`] with a
//! [`crate::saturation::SaturationDetector`], both built from one
//! [`crate::utils::toml_config::EngineConfig`].
//!
//! # Usage
//!
//! ```ignore
//! use ares_dispatch::research::ResearchBranch;
//!
//! let mut branch = ResearchBranch::new("quantum error correction", config)?;
//!
//! loop {
//!     let backends = branch.plan_round(&roster, &DispatchRequest::new());
//!     if backends.is_empty() {
//!         break;
//!     }
//!
//!     let mut batch = query_all(&backends).await; // external clients
//!     for backend in &backends {
//!         branch.complete_backend(&backend.name, true);
//!     }
//!
//!     let report = branch.complete_round(&mut batch);
//!     if report.recommendation == Recommendation::Stop {
//!         break;
//!     }
//! }
//! ```
//!
//! # Round Workflow
//!
//! 1. **Dispatch** - Select backends and mark them in flight
//! 2. **Query** - External clients call the selected backends
//! 3. **Release** - Report completion and failures per backend
//! 4. **Judge** - Feed the complete batch to the saturation detector
//! 5. **Decide** - Continue, adjust the query, or stop the branch

/// Per-branch dispatch and saturation state.
pub mod branch;

pub use branch::ResearchBranch;
