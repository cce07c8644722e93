//! Saturation detection for iterative research branches.
//!
//! After every round the detector folds the batch into its cross-round state
//! and decides whether the branch should continue, change query strategy, or
//! stop.

use super::criteria::SaturationCriteria;
use super::metrics::{self, SaturationMetrics};
use crate::types::ResultRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Records kept in the trailing window used for trend metrics
pub const WINDOW_SIZE: usize = 50;

/// Conditions that must hold together before a branch counts as saturated
const QUORUM: usize = 2;

/// Verdict handed back to the orchestration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Continue,
    AdjustStrategy,
    Stop,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Recommendation::Continue => "continue",
            Recommendation::AdjustStrategy => "adjust_strategy",
            Recommendation::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// One saturation condition that held for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationSignal {
    HighDuplicates,
    LowNovelty,
    SourceOverlap,
    LowInformationGain,
    ResultCap,
}

/// Outcome of one `detect_saturation` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationReport {
    pub is_saturated: bool,
    pub saturation_level: f64,
    pub metrics: SaturationMetrics,
    pub recommendation: Recommendation,
    pub reasoning: String,
    pub next_actions: Vec<String>,
    pub breached: Vec<SaturationSignal>,
}

impl SaturationReport {
    /// Report as JSON for the tool layer
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Aggregate counters for observability
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchStats {
    pub total_rounds: usize,
    pub total_results: usize,
    pub unique_identifiers: usize,
    pub unique_fingerprints: usize,
    pub unique_sources: usize,
    pub mean_relevance: f64,
    pub window_len: usize,
}

/// Cross-round saturation state for a single research branch.
///
/// Call [`SaturationDetector::detect_saturation`] exactly once per round with
/// the complete batch; "seen before" is judged against state from earlier
/// rounds only.
#[derive(Debug, Clone, Default)]
pub struct SaturationDetector {
    criteria: SaturationCriteria,
    seen_identifiers: HashSet<String>,
    seen_fingerprints: HashSet<String>,
    seen_sources: HashSet<String>,
    history: Vec<ResultRecord>,
    window: VecDeque<ResultRecord>,
    rounds: usize,
}

impl SaturationDetector {
    pub fn new(criteria: SaturationCriteria) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    pub fn criteria(&self) -> &SaturationCriteria {
        &self.criteria
    }

    /// Full ordered history of records seen by this branch
    pub fn history(&self) -> &[ResultRecord] {
        &self.history
    }

    /// Fold one round's batch into the branch state and judge saturation.
    ///
    /// Fingerprints and novelty scores are written back onto `new_results`.
    pub fn detect_saturation(
        &mut self,
        new_results: &mut [ResultRecord],
        branch_target: &str,
    ) -> SaturationReport {
        self.rounds += 1;

        let (distinct_sources, overlapping) = {
            let batch_sources: HashSet<&str> = new_results
                .iter()
                .map(|r| r.source_name.as_str())
                .collect();
            let overlapping = batch_sources
                .iter()
                .filter(|source| self.seen_sources.contains(**source))
                .count();
            (batch_sources.len(), overlapping)
        };

        let mut duplicates = 0usize;
        for record in new_results.iter_mut() {
            let fp = metrics::fingerprint(&record.raw_content);
            let seen_id =
                !record.identifier.is_empty() && self.seen_identifiers.contains(&record.identifier);
            let seen_fp = !record.raw_content.is_empty() && self.seen_fingerprints.contains(&fp);
            if seen_id || seen_fp {
                duplicates += 1;
            }

            record.novelty_score = metrics::novelty(&record.raw_content, branch_target);
            record.content_fingerprint = Some(fp);
        }

        self.absorb(new_results);

        let batch_len = new_results.len();
        let metrics = SaturationMetrics {
            duplicate_rate: ratio(duplicates, batch_len),
            novelty_score: if batch_len == 0 {
                0.0
            } else {
                new_results.iter().map(|r| r.novelty_score).sum::<f64>() / batch_len as f64
            },
            source_overlap_rate: ratio(overlapping, distinct_sources),
            information_gain_rate: metrics::information_gain(
                self.history.len(),
                self.window.make_contiguous(),
            ),
            search_efficiency: metrics::search_efficiency(new_results),
        };

        let report = self.judge(metrics);

        tracing::debug!(
            round = self.rounds,
            batch = batch_len,
            history = self.history.len(),
            duplicate_rate = metrics.duplicate_rate,
            novelty = metrics.novelty_score,
            overlap = metrics.source_overlap_rate,
            gain = metrics.information_gain_rate,
            efficiency = metrics.search_efficiency,
            level = report.saturation_level,
            recommendation = %report.recommendation,
            "Saturation check"
        );

        report
    }

    /// Forget everything and start a fresh branch
    pub fn reset(&mut self) {
        self.seen_identifiers.clear();
        self.seen_fingerprints.clear();
        self.seen_sources.clear();
        self.history.clear();
        self.window.clear();
        self.rounds = 0;
    }

    pub fn search_stats(&self) -> SearchStats {
        SearchStats {
            total_rounds: self.rounds,
            total_results: self.history.len(),
            unique_identifiers: self.seen_identifiers.len(),
            unique_fingerprints: self.seen_fingerprints.len(),
            unique_sources: self.seen_sources.len(),
            mean_relevance: metrics::mean_relevance(&self.history),
            window_len: self.window.len(),
        }
    }

    fn absorb(&mut self, batch: &[ResultRecord]) {
        for record in batch {
            if !record.identifier.is_empty() {
                self.seen_identifiers.insert(record.identifier.clone());
            }
            if !record.raw_content.is_empty() {
                if let Some(fp) = &record.content_fingerprint {
                    self.seen_fingerprints.insert(fp.clone());
                }
            }
            self.seen_sources.insert(record.source_name.clone());

            self.history.push(record.clone());
            self.window.push_back(record.clone());
        }

        while self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }
    }

    fn judge(&self, metrics: SaturationMetrics) -> SaturationReport {
        let criteria = &self.criteria;
        let history_len = self.history.len();

        let conditions = [
            (
                SaturationSignal::HighDuplicates,
                metrics.duplicate_rate >= criteria.duplicate_threshold,
            ),
            (
                SaturationSignal::LowNovelty,
                metrics.novelty_score <= criteria.novelty_threshold,
            ),
            (
                SaturationSignal::SourceOverlap,
                metrics.source_overlap_rate >= criteria.source_overlap_limit,
            ),
            (
                SaturationSignal::LowInformationGain,
                metrics.information_gain_rate <= criteria.information_gain_threshold,
            ),
            (
                SaturationSignal::ResultCap,
                history_len >= criteria.max_results,
            ),
        ];
        let breached: Vec<SaturationSignal> = conditions
            .iter()
            .filter(|(_, held)| *held)
            .map(|(signal, _)| *signal)
            .collect();

        let warmed_up = history_len >= criteria.min_results;
        let is_saturated = breached.len() >= QUORUM && warmed_up;

        let recommendation = if is_saturated {
            Recommendation::Stop
        } else if metrics.search_efficiency < 0.3 || metrics.information_gain_rate < 0.2 {
            Recommendation::AdjustStrategy
        } else {
            Recommendation::Continue
        };

        SaturationReport {
            is_saturated,
            saturation_level: metrics.saturation_level(),
            metrics,
            recommendation,
            reasoning: self.reasoning(&metrics, &breached, is_saturated, warmed_up),
            next_actions: next_actions(recommendation, &metrics, &breached),
            breached,
        }
    }

    fn reasoning(
        &self,
        metrics: &SaturationMetrics,
        breached: &[SaturationSignal],
        is_saturated: bool,
        warmed_up: bool,
    ) -> String {
        if breached.is_empty() {
            return "No saturation thresholds breached; search can continue".to_string();
        }

        let criteria = &self.criteria;
        let details: Vec<String> = breached
            .iter()
            .map(|signal| match signal {
                SaturationSignal::HighDuplicates => format!(
                    "duplicate rate {:.2} reached threshold {:.2}",
                    metrics.duplicate_rate, criteria.duplicate_threshold
                ),
                SaturationSignal::LowNovelty => format!(
                    "novelty {:.2} fell to threshold {:.2}",
                    metrics.novelty_score, criteria.novelty_threshold
                ),
                SaturationSignal::SourceOverlap => format!(
                    "source overlap {:.2} reached limit {:.2}",
                    metrics.source_overlap_rate, criteria.source_overlap_limit
                ),
                SaturationSignal::LowInformationGain => format!(
                    "information gain {:.2} fell to threshold {:.2}",
                    metrics.information_gain_rate, criteria.information_gain_threshold
                ),
                SaturationSignal::ResultCap => format!(
                    "{} results processed, cap is {}",
                    self.history.len(),
                    criteria.max_results
                ),
            })
            .collect();

        let mut reasoning = if is_saturated {
            format!("Branch saturated: {}", details.join("; "))
        } else {
            format!("Thresholds breached: {}", details.join("; "))
        };

        if !warmed_up {
            reasoning.push_str(&format!(
                " (stop deferred until {} results are processed)",
                criteria.min_results
            ));
        } else if !is_saturated {
            reasoning.push_str(&format!(
                " (stop requires {} breached conditions)",
                QUORUM
            ));
        }

        reasoning
    }
}

fn next_actions(
    recommendation: Recommendation,
    metrics: &SaturationMetrics,
    breached: &[SaturationSignal],
) -> Vec<String> {
    let mut actions: Vec<&str> = Vec::new();

    match recommendation {
        Recommendation::Stop => {
            actions.push("Stop querying this branch");
            actions.push("Synthesize the findings collected so far");
            if breached.contains(&SaturationSignal::SourceOverlap) {
                actions.push("Avoid repeated sources in follow-up branches");
            }
        }
        Recommendation::AdjustStrategy => {
            if metrics.search_efficiency < 0.3 {
                actions.push("Refine the query with more specific keywords");
            }
            if metrics.information_gain_rate < 0.2 {
                actions.push("Broaden the query to reach adjacent topics");
            }
        }
        Recommendation::Continue => {
            actions.push("Continue with the current query strategy");
        }
    }

    if recommendation != Recommendation::Stop {
        for signal in breached {
            let hint = match signal {
                SaturationSignal::HighDuplicates => "Rephrase the query to avoid duplicate results",
                SaturationSignal::LowNovelty => "Broaden the query to surface novel content",
                SaturationSignal::SourceOverlap => "Avoid repeated sources and dispatch to unused backends",
                SaturationSignal::LowInformationGain => "Switch to a different query angle",
                SaturationSignal::ResultCap => "Prioritize synthesis, the result budget is exhausted",
            };
            if !actions.contains(&hint) {
                actions.push(hint);
            }
        }
    }

    actions.into_iter().map(String::from).collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
