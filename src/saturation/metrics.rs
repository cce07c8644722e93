//! Per-round saturation metrics and the scoring helpers behind them.

use crate::types::ResultRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// History length below which information gain is reported as 1.0
pub const WARMUP_HISTORY: usize = 10;

/// Records compared against the earlier baseline for information gain
pub const RECENT_SPAN: usize = 10;

/// Relevance a record must exceed to count as efficient
const EFFICIENT_RELEVANCE: f64 = 0.7;

/// Novelty a record must exceed to count as efficient
const EFFICIENT_NOVELTY: f64 = 0.5;

/// Metrics computed for one round's batch. Every value is within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SaturationMetrics {
    pub duplicate_rate: f64,
    pub novelty_score: f64,
    pub source_overlap_rate: f64,
    pub information_gain_rate: f64,
    pub search_efficiency: f64,
}

impl SaturationMetrics {
    /// Weighted 0-1 summary of how saturated the branch looks.
    pub fn saturation_level(&self) -> f64 {
        let level = 0.30 * self.duplicate_rate
            + 0.25 * (1.0 - self.novelty_score)
            + 0.20 * self.source_overlap_rate
            + 0.15 * (1.0 - self.information_gain_rate)
            + 0.10 * (1.0 - self.search_efficiency);
        level.clamp(0.0, 1.0)
    }
}

/// Dedup key for a record's content.
pub fn fingerprint(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Novelty heuristic for one piece of content relative to the branch target.
///
/// Starts at 0.5, adds 0.1 past 1000 chars and another 0.1 past 3000, plus up
/// to 0.3 for the share of target keywords present (case-insensitive).
pub fn novelty(content: &str, branch_target: &str) -> f64 {
    let mut score = 0.5;

    let length = content.chars().count();
    if length > 1000 {
        score += 0.1;
    }
    if length > 3000 {
        score += 0.1;
    }

    let keywords: Vec<String> = branch_target
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if !keywords.is_empty() {
        let haystack = content.to_lowercase();
        let found = keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count();
        score += 0.3 * found as f64 / keywords.len() as f64;
    }

    score.min(1.0)
}

/// Relevance trend over the trailing window.
///
/// `history_len` is the full-run history length and drives the warm-up
/// short-circuit; `window` holds the most recent records. With no earlier
/// baseline in the window the branch is still warming up.
pub fn information_gain(history_len: usize, window: &[ResultRecord]) -> f64 {
    if history_len < WARMUP_HISTORY || window.len() <= RECENT_SPAN {
        return 1.0;
    }

    let split = window.len() - RECENT_SPAN;
    let earlier = mean_relevance(&window[..split]);
    let recent = mean_relevance(&window[split..]);

    ((recent - earlier + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Share of the batch that is both relevant and novel
pub fn search_efficiency(batch: &[ResultRecord]) -> f64 {
    if batch.is_empty() {
        return 0.0;
    }
    let efficient = batch
        .iter()
        .filter(|r| r.relevance_score > EFFICIENT_RELEVANCE && r.novelty_score > EFFICIENT_NOVELTY)
        .count();
    efficient as f64 / batch.len() as f64
}

pub(crate) fn mean_relevance(records: &[ResultRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.relevance_score).sum::<f64>() / records.len() as f64
}
