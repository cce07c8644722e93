use crate::{
    dispatch::LoadBalancer,
    saturation::{Recommendation, SaturationDetector, SaturationReport},
    types::{AppError, BackendDescriptor, DispatchRequest, ResultRecord, Result},
    utils::toml_config::EngineConfig,
};
use std::path::Path;
use uuid::Uuid;

/// One independent line of iterative research.
///
/// Owns its own load balancer and saturation detector so branches can run
/// concurrently without sharing mutable state.
pub struct ResearchBranch {
    id: Uuid,
    target: String,
    balancer: LoadBalancer,
    detector: SaturationDetector,
    pending: Vec<ResultRecord>,
    last_report: Option<SaturationReport>,
}

impl ResearchBranch {
    pub fn new(target: impl Into<String>, config: EngineConfig) -> Result<Self> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Research branch target must not be empty".to_string(),
            ));
        }
        config.validate()?;

        let id = Uuid::new_v4();
        tracing::info!(
            branch_id = %id,
            target = %target,
            strategy = %config.load_balancing.strategy,
            "Research branch started"
        );

        Ok(Self {
            id,
            target,
            balancer: LoadBalancer::new(config.load_balancing),
            detector: SaturationDetector::new(config.saturation),
            pending: Vec::new(),
            last_report: None,
        })
    }

    /// Build a branch from a `dispatch.toml` file
    pub fn from_config_file<P: AsRef<Path>>(target: impl Into<String>, path: P) -> Result<Self> {
        let config = EngineConfig::load(path)?;
        Self::new(target, config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    pub fn detector(&self) -> &SaturationDetector {
        &self.detector
    }

    pub fn last_report(&self) -> Option<&SaturationReport> {
        self.last_report.as_ref()
    }

    /// True once the most recent verdict was `stop`
    pub fn is_finished(&self) -> bool {
        self.last_report
            .as_ref()
            .map(|r| r.recommendation == Recommendation::Stop)
            .unwrap_or(false)
    }

    /// Select this round's backends and mark each as in flight.
    ///
    /// The caller reports each backend's completion with
    /// [`ResearchBranch::complete_backend`].
    pub fn plan_round(
        &self,
        available: &[BackendDescriptor],
        request: &DispatchRequest,
    ) -> Vec<BackendDescriptor> {
        let selected = self.balancer.select_backends(available, request);
        for backend in &selected {
            self.balancer.record_connection(&backend.name);
        }

        if selected.is_empty() {
            tracing::info!(branch_id = %self.id, "No backends available this round");
        }

        selected
    }

    /// Release a backend's connection and record whether the call succeeded
    pub fn complete_backend(&self, name: &str, succeeded: bool) {
        self.balancer.release_connection(name);
        if succeeded {
            self.balancer.record_success(name);
        } else {
            self.balancer.record_failure(name);
        }
    }

    /// Alternative backend to retry after `failed` errored
    pub fn fallback_for(&self, failed: &BackendDescriptor) -> Option<BackendDescriptor> {
        self.balancer.fallback_backend(failed)
    }

    /// Run the saturation check for one complete round.
    pub fn complete_round(&mut self, batch: &mut [ResultRecord]) -> SaturationReport {
        let report = self.detector.detect_saturation(batch, &self.target);

        if report.is_saturated {
            tracing::info!(
                branch_id = %self.id,
                level = report.saturation_level,
                reasoning = %report.reasoning,
                "Research branch saturated"
            );
        } else {
            tracing::debug!(
                branch_id = %self.id,
                recommendation = %report.recommendation,
                "Round complete"
            );
        }

        self.last_report = Some(report.clone());
        report
    }

    /// Hold results that arrive while backends of the current round are still running
    pub fn buffer_results<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ResultRecord>,
    {
        self.pending.extend(records);
    }

    /// Number of buffered results awaiting [`ResearchBranch::flush_round`]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Judge every buffered result as one round, returning the scored records
    pub fn flush_round(&mut self) -> (SaturationReport, Vec<ResultRecord>) {
        let mut batch = std::mem::take(&mut self.pending);
        let report = self.complete_round(&mut batch);
        (report, batch)
    }

    /// Start over with fresh saturation state; live connection counts are kept
    pub fn reset(&mut self) {
        self.detector.reset();
        self.pending.clear();
        self.last_report = None;
        tracing::info!(branch_id = %self.id, "Research branch reset");
    }
}
