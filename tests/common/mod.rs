//! Shared fixtures for integration tests.
//!
//! Each test binary only uses part of this module.
#![allow(dead_code)]

use ares_dispatch::types::{BackendDescriptor, ResultRecord};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Backends with equal priority and unset reliability.
pub fn uniform_roster(names: &[&str]) -> Vec<BackendDescriptor> {
    names
        .iter()
        .map(|name| BackendDescriptor::new(*name, 1))
        .collect()
}

/// A typical mixed roster of search backends.
pub fn research_roster() -> Vec<BackendDescriptor> {
    vec![
        BackendDescriptor::new("duckduckgo", 5).with_reliability(0.9),
        BackendDescriptor::new("arxiv", 8).with_reliability(0.95),
        BackendDescriptor::new("github", 6).with_reliability(0.7),
        BackendDescriptor::new("hackernews", 3),
        BackendDescriptor::new("wikipedia", 7).with_reliability(0.99),
    ]
}

pub fn names(backends: &[BackendDescriptor]) -> Vec<&str> {
    backends.iter().map(|b| b.name.as_str()).collect()
}

pub fn record(id: &str, source: &str, content: &str, relevance: f64) -> ResultRecord {
    ResultRecord::new(id, source, content, relevance)
}

/// `count` unique records from `source`, all with the same relevance.
pub fn unique_batch(prefix: &str, source: &str, count: usize, relevance: f64) -> Vec<ResultRecord> {
    (0..count)
        .map(|i| {
            record(
                &format!("https://{}.example/{}", prefix, i),
                source,
                &format!("{} finding number {}", prefix, i),
                relevance,
            )
        })
        .collect()
}
