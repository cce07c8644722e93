//! Backend Dispatch
//!
//! Decides which search backends are queried in each research round.
//!
//! # Architecture
//!
//! - [`balancer::LoadBalancer`] - Selects backends and tracks in-flight connections
//! - [`strategy::SelectionStrategy`] - Round-robin, weighted, least-connections or health-based ranking
//! - [`strategy::WeightingPolicy`] - Recency bonus and load penalty used by the weighted strategy
//!
//! The balancer never talks to a backend itself. Callers report connection
//! lifecycle through [`balancer::LoadBalancer::record_connection`] and
//! [`balancer::LoadBalancer::release_connection`], and the next selection
//! reacts to that load.

/// Backend selection and connection bookkeeping.
pub mod balancer;
/// Ranking strategies.
pub mod strategy;

pub use balancer::{DispatcherStats, LoadBalancer, LoadBalancingConfig};
pub use strategy::{SelectionStrategy, WeightingPolicy};
