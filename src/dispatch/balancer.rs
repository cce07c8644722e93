//! Backend load balancer.
//!
//! Picks the backends queried in one research round and keeps per-backend
//! connection bookkeeping so later rounds can react to current load.
//!
//! # Example
//!
//! ```rust
//! use ares_dispatch::dispatch::{LoadBalancer, LoadBalancingConfig, SelectionStrategy};
//! use ares_dispatch::types::{BackendDescriptor, DispatchRequest};
//!
//! let balancer = LoadBalancer::new(
//!     LoadBalancingConfig::default().with_strategy(SelectionStrategy::LeastConnections),
//! );
//! let roster = vec![
//!     BackendDescriptor::new("arxiv", 5),
//!     BackendDescriptor::new("github", 3),
//! ];
//!
//! let selected = balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(1));
//! for backend in &selected {
//!     balancer.record_connection(&backend.name);
//! }
//! // ... query the backend, then
//! balancer.release_connection("arxiv");
//! ```

use super::strategy::{self, LoadSnapshot, SelectionStrategy, WeightingPolicy};
use crate::types::{BackendDescriptor, DispatchRequest};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Configuration for the load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancingConfig {
    /// Selection strategy for the whole run (default: weighted)
    #[serde(default)]
    pub strategy: SelectionStrategy,

    /// How often the health monitor is expected to refresh the roster (default: 60 seconds)
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    /// Consecutive failures after which a backend is no longer offered as a fallback (default: 3)
    #[serde(default = "default_failover_threshold")]
    pub failover_threshold: u32,

    /// Weighted strategy tuning
    #[serde(default)]
    pub weighting: WeightingPolicy,
}

fn default_health_check_interval_secs() -> u64 {
    60
}

fn default_failover_threshold() -> u32 {
    3
}

impl Default for LoadBalancingConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            health_check_interval_secs: default_health_check_interval_secs(),
            failover_threshold: default_failover_threshold(),
            weighting: WeightingPolicy::default(),
        }
    }
}

impl LoadBalancingConfig {
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval_secs = interval.as_secs();
        self
    }

    pub fn with_failover_threshold(mut self, threshold: u32) -> Self {
        self.failover_threshold = threshold;
        self
    }

    pub fn with_weighting(mut self, weighting: WeightingPolicy) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Connection bookkeeping for a single backend
#[derive(Debug, Clone, Default)]
struct ConnectionEntry {
    open: usize,
    last_used: Option<Instant>,
    last_used_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

/// Read-only snapshot of balancer state
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStats {
    pub strategy: SelectionStrategy,
    pub connection_counts: BTreeMap<String, usize>,
    pub last_used: BTreeMap<String, DateTime<Utc>>,
    pub failure_counts: BTreeMap<String, u32>,
}

impl DispatcherStats {
    /// Total open connections across all backends
    pub fn total_open(&self) -> usize {
        self.connection_counts.values().sum()
    }
}

/// Selects backends per round and tracks their live load.
///
/// All methods take `&self`; connection counters sit behind a mutex so that
/// parallel in-flight requests can record and release concurrently. Rounds
/// themselves are expected to be serialized by the caller.
pub struct LoadBalancer {
    config: LoadBalancingConfig,
    connections: Mutex<HashMap<String, ConnectionEntry>>,
    cursor: Mutex<usize>,
    roster: RwLock<Vec<BackendDescriptor>>,
    roster_refreshed: Mutex<Option<Instant>>,
}

impl LoadBalancer {
    pub fn new(config: LoadBalancingConfig) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
            cursor: Mutex::new(0),
            roster: RwLock::new(Vec::new()),
            roster_refreshed: Mutex::new(None),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LoadBalancingConfig::default())
    }

    pub fn config(&self) -> &LoadBalancingConfig {
        &self.config
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.config.strategy
    }

    /// Pick the ordered subset of backends to query this round.
    ///
    /// An explicit allow-list in the request restricts candidates to the named
    /// backends; if none of them is available the full roster is ranked
    /// instead. An empty result means "no backends this round".
    ///
    /// `available` becomes the fallback roster unless a `refresh_roster` call
    /// is still within the health check interval.
    pub fn select_backends(
        &self,
        available: &[BackendDescriptor],
        request: &DispatchRequest,
    ) -> Vec<BackendDescriptor> {
        let unique = Self::unique(available);
        if self.health_check_due() {
            *self.roster.write() = unique.clone();
        }

        if unique.is_empty() {
            tracing::debug!("No backends available for dispatch");
            return Vec::new();
        }

        let candidates = Self::candidates(unique, request);
        let count = request.effective_max_sources().min(candidates.len());
        if count == 0 {
            return Vec::new();
        }

        let order = match self.config.strategy {
            SelectionStrategy::RoundRobin => {
                let mut cursor = self.cursor.lock();
                let picked = strategy::rotate(*cursor, candidates.len(), count);
                *cursor = (*cursor + count) % candidates.len();
                picked
            }
            other => self.ranked(other, &candidates),
        };

        let selected: Vec<BackendDescriptor> = order
            .into_iter()
            .take(count)
            .map(|i| candidates[i].clone())
            .collect();

        tracing::debug!(
            strategy = %self.config.strategy,
            candidates = candidates.len(),
            selected = ?selected.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            "Selected backends for round"
        );

        selected
    }

    /// Mark a request to `name` as in flight
    pub fn record_connection(&self, name: &str) {
        let mut connections = self.connections.lock();
        let entry = connections.entry(name.to_string()).or_default();
        entry.open += 1;
        entry.last_used = Some(Instant::now());
        entry.last_used_at = Some(Utc::now());
    }

    /// Mark a request to `name` as finished. Never drops below zero.
    pub fn release_connection(&self, name: &str) {
        let mut connections = self.connections.lock();
        if let Some(entry) = connections.get_mut(name) {
            entry.open = entry.open.saturating_sub(1);
        }
    }

    /// Note a failed request; counts toward the failover threshold
    pub fn record_failure(&self, name: &str) {
        let mut connections = self.connections.lock();
        let entry = connections.entry(name.to_string()).or_default();
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
        if entry.consecutive_failures == self.config.failover_threshold {
            tracing::warn!(
                backend = name,
                failures = entry.consecutive_failures,
                "Backend reached failover threshold"
            );
        }
    }

    /// Note a successful request, clearing the failure streak
    pub fn record_success(&self, name: &str) {
        if let Some(entry) = self.connections.lock().get_mut(name) {
            entry.consecutive_failures = 0;
        }
    }

    /// Current open-connection count for `name`
    pub fn open_connections(&self, name: &str) -> usize {
        self.connections
            .lock()
            .get(name)
            .map(|entry| entry.open)
            .unwrap_or(0)
    }

    /// Replace the remembered roster with fresh health data.
    ///
    /// The refreshed roster stays authoritative for fallback until the health
    /// check interval elapses; `select_backends` does not overwrite it before then.
    pub fn refresh_roster(&self, roster: Vec<BackendDescriptor>) {
        *self.roster.write() = Self::unique(&roster);
        *self.roster_refreshed.lock() = Some(Instant::now());
    }

    /// True when the roster has not been refreshed within the health check interval
    pub fn health_check_due(&self) -> bool {
        match *self.roster_refreshed.lock() {
            Some(at) => at.elapsed() >= self.config.health_check_interval(),
            None => true,
        }
    }

    /// Pick a backend to retry against after `failed` errored.
    ///
    /// Candidates come from the most recent roster, minus `failed` and any
    /// backend at or above the failover threshold. Round-robin walks the full
    /// roster from the cursor, so the pick is the next backend in rotation; the
    /// cursor itself is not advanced.
    pub fn fallback_backend(&self, failed: &BackendDescriptor) -> Option<BackendDescriptor> {
        let roster = self.roster.read().clone();
        let eligible: Vec<bool> = {
            let connections = self.connections.lock();
            roster
                .iter()
                .map(|b| {
                    b.name != failed.name
                        && connections
                            .get(&b.name)
                            .map(|e| e.consecutive_failures < self.config.failover_threshold)
                            .unwrap_or(true)
                })
                .collect()
        };

        let index = match self.config.strategy {
            SelectionStrategy::RoundRobin => {
                let cursor = *self.cursor.lock();
                strategy::rotate(cursor, roster.len(), roster.len())
                    .into_iter()
                    .find(|&i| eligible[i])
            }
            other => {
                let candidates: Vec<BackendDescriptor> = roster
                    .iter()
                    .zip(&eligible)
                    .filter(|(_, ok)| **ok)
                    .map(|(b, _)| b.clone())
                    .collect();
                let best = self.ranked(other, &candidates).first().copied();
                best.and_then(|i| roster.iter().position(|b| b.name == candidates[i].name))
            }
        };

        let Some(index) = index else {
            tracing::debug!(failed = %failed.name, "No fallback backend available");
            return None;
        };

        let fallback = roster.get(index)?.clone();
        tracing::debug!(failed = %failed.name, fallback = %fallback.name, "Selected fallback backend");
        Some(fallback)
    }

    /// Snapshot of connection counts, last-use timestamps and failure streaks
    pub fn stats(&self) -> DispatcherStats {
        let connections = self.connections.lock();
        let mut stats = DispatcherStats {
            strategy: self.config.strategy,
            connection_counts: BTreeMap::new(),
            last_used: BTreeMap::new(),
            failure_counts: BTreeMap::new(),
        };

        for (name, entry) in connections.iter() {
            stats.connection_counts.insert(name.clone(), entry.open);
            if let Some(at) = entry.last_used_at {
                stats.last_used.insert(name.clone(), at);
            }
            stats
                .failure_counts
                .insert(name.clone(), entry.consecutive_failures);
        }

        stats
    }

    /// First occurrence of each backend name, in roster order
    fn unique(available: &[BackendDescriptor]) -> Vec<BackendDescriptor> {
        let mut seen = HashSet::new();
        available
            .iter()
            .filter(|b| seen.insert(b.name.as_str()))
            .cloned()
            .collect()
    }

    fn candidates(
        unique: Vec<BackendDescriptor>,
        request: &DispatchRequest,
    ) -> Vec<BackendDescriptor> {
        if request.requested_sources.is_empty() {
            return unique;
        }

        let allowed: HashSet<&str> = request
            .requested_sources
            .iter()
            .map(String::as_str)
            .collect();
        let filtered: Vec<BackendDescriptor> = unique
            .iter()
            .filter(|b| allowed.contains(b.name.as_str()))
            .cloned()
            .collect();

        if filtered.is_empty() {
            tracing::warn!(
                requested = ?request.requested_sources,
                "None of the requested sources are available, ranking full roster"
            );
            return unique;
        }

        filtered
    }

    fn ranked(&self, strategy: SelectionStrategy, candidates: &[BackendDescriptor]) -> Vec<usize> {
        let load: Vec<LoadSnapshot> = {
            let connections = self.connections.lock();
            candidates
                .iter()
                .map(|b| {
                    connections
                        .get(&b.name)
                        .map(|e| LoadSnapshot {
                            open_connections: e.open,
                            last_used: e.last_used,
                        })
                        .unwrap_or_default()
                })
                .collect()
        };

        strategy::rank(
            strategy,
            candidates,
            &load,
            &self.config.weighting,
            Instant::now(),
        )
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
