//! Backend ranking strategies.
//!
//! Every strategy ranks a candidate slice into an ordering of indices. Ties
//! always keep the caller's original order (stable sorts only), so identical
//! inputs produce identical selections.

use crate::types::BackendDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// How the dispatcher orders candidate backends.
///
/// Chosen once per run from configuration; strategies are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Rotate through candidates with a shared cursor
    RoundRobin,
    /// Priority scaled by recency bonus and load penalty
    #[default]
    Weighted,
    /// Fewest open connections first
    LeastConnections,
    /// Highest reliability first
    HealthBased,
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionStrategy::RoundRobin => "round_robin",
            SelectionStrategy::Weighted => "weighted",
            SelectionStrategy::LeastConnections => "least_connections",
            SelectionStrategy::HealthBased => "health_based",
        };
        f.write_str(name)
    }
}

/// Tuning knobs for the weighted strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingPolicy {
    /// Multiplier for backends idle longer than `recency_window_ms` (default: 1.2)
    #[serde(default = "default_recency_bonus")]
    pub recency_bonus: f64,

    /// Idle time after which the recency bonus applies (default: 60 seconds)
    #[serde(default = "default_recency_window_ms")]
    pub recency_window_ms: u64,

    /// Multiplier for backends above `load_threshold` open connections (default: 0.8)
    #[serde(default = "default_load_penalty")]
    pub load_penalty: f64,

    /// Open connections tolerated before the load penalty applies (default: 10)
    #[serde(default = "default_load_threshold")]
    pub load_threshold: usize,
}

fn default_recency_bonus() -> f64 {
    1.2
}

fn default_recency_window_ms() -> u64 {
    60_000
}

fn default_load_penalty() -> f64 {
    0.8
}

fn default_load_threshold() -> usize {
    10
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self {
            recency_bonus: default_recency_bonus(),
            recency_window_ms: default_recency_window_ms(),
            load_penalty: default_load_penalty(),
            load_threshold: default_load_threshold(),
        }
    }
}

impl WeightingPolicy {
    pub fn recency_window(&self) -> Duration {
        Duration::from_millis(self.recency_window_ms)
    }

    /// Set the idle window after which the recency bonus applies
    pub fn with_recency_window(mut self, window: Duration) -> Self {
        self.recency_window_ms = window.as_millis() as u64;
        self
    }

    /// Compute the dispatch weight of one backend.
    ///
    /// A backend that has never been dispatched counts as idle.
    pub fn weight(
        &self,
        priority: i64,
        open_connections: usize,
        last_used: Option<Instant>,
        now: Instant,
    ) -> f64 {
        let idle = match last_used {
            Some(at) => now.saturating_duration_since(at) >= self.recency_window(),
            None => true,
        };
        let recency = if idle { self.recency_bonus } else { 1.0 };
        let load = if open_connections > self.load_threshold {
            self.load_penalty
        } else {
            1.0
        };

        priority as f64 * recency * load
    }
}

/// Load signals for one candidate, captured under the connection lock.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LoadSnapshot {
    pub open_connections: usize,
    pub last_used: Option<Instant>,
}

/// Rank candidates for the non-rotating strategies.
///
/// Returns candidate indices, best first. Round-robin is handled by the
/// balancer because it depends on the shared cursor; here it keeps the
/// original order.
pub(crate) fn rank(
    strategy: SelectionStrategy,
    candidates: &[BackendDescriptor],
    load: &[LoadSnapshot],
    policy: &WeightingPolicy,
    now: Instant,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();

    match strategy {
        SelectionStrategy::RoundRobin => {}
        SelectionStrategy::Weighted => {
            let weights: Vec<f64> = candidates
                .iter()
                .zip(load)
                .map(|(backend, snap)| {
                    policy.weight(backend.priority, snap.open_connections, snap.last_used, now)
                })
                .collect();
            order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        }
        SelectionStrategy::LeastConnections => {
            order.sort_by_key(|&i| load[i].open_connections);
        }
        SelectionStrategy::HealthBased => {
            order.sort_by(|&a, &b| {
                candidates[b]
                    .effective_reliability()
                    .total_cmp(&candidates[a].effective_reliability())
            });
        }
    }

    order
}

/// Indices picked by a rotation starting at `cursor`.
pub(crate) fn rotate(cursor: usize, candidates: usize, count: usize) -> Vec<usize> {
    if candidates == 0 {
        return Vec::new();
    }
    let start = cursor % candidates;
    (0..count.min(candidates))
        .map(|offset| (start + offset) % candidates)
        .collect()
}
