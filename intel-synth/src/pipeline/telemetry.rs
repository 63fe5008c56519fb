//! Request-scoped pipeline telemetry
//!
//! Created at pipeline entry, fed by each stage, and consumed into the
//! `performance`/`usage` blocks of the response. Nothing is retained after
//! the response is built.

use crate::types::{SearchOutcome, TokenUsage};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

pub const STAGE_EXTRACTION: &str = "extraction";
pub const STAGE_SEARCH: &str = "search";
pub const STAGE_AGGREGATION: &str = "aggregation";

/// One timed stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: u64,
}

/// Roll-up returned as `performance`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub total_duration_ms: u64,
    pub extraction_ms: u64,
    pub search_ms: u64,
    pub aggregation_ms: u64,
    /// Mean wall-clock duration of individual search tasks
    pub average_search_ms: u64,
    pub successful_searches: usize,
    pub total_searches: usize,
    pub stages: Vec<StageTiming>,
}

pub struct PipelineTelemetry {
    run_id: Uuid,
    started: Instant,
    stages: Vec<StageTiming>,
    usage: TokenUsage,
}

impl PipelineTelemetry {
    pub fn start(run_id: Uuid) -> Self {
        Self {
            run_id,
            started: Instant::now(),
            stages: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn record_stage(&mut self, stage: &str, elapsed: Duration) {
        let duration_ms = elapsed.as_millis() as u64;
        info!(run_id = %self.run_id, stage, duration_ms, "Pipeline stage complete");
        self.stages.push(StageTiming {
            stage: stage.to_string(),
            duration_ms,
        });
    }

    pub fn add_usage(&mut self, usage: &Option<TokenUsage>) {
        self.usage += usage;
    }

    pub fn stage_ms(&self, stage: &str) -> u64 {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.duration_ms)
            .sum()
    }

    /// Close the run and produce the performance and usage blocks
    pub fn finish(self, outcomes: &[SearchOutcome]) -> (PerformanceReport, TokenUsage) {
        let total_searches = outcomes.len();
        let successful_searches = outcomes.iter().filter(|o| o.success).count();
        let average_search_ms = if total_searches == 0 {
            0
        } else {
            outcomes.iter().map(|o| o.duration_ms).sum::<u64>() / total_searches as u64
        };

        let report = PerformanceReport {
            total_duration_ms: self.started.elapsed().as_millis() as u64,
            extraction_ms: self.stage_ms(STAGE_EXTRACTION),
            search_ms: self.stage_ms(STAGE_SEARCH),
            aggregation_ms: self.stage_ms(STAGE_AGGREGATION),
            average_search_ms,
            successful_searches,
            total_searches,
            stages: self.stages,
        };

        info!(
            run_id = %self.run_id,
            total_ms = report.total_duration_ms,
            successful = successful_searches,
            total = total_searches,
            tokens = self.usage.total_tokens,
            "Pipeline run complete"
        );

        (report, self.usage)
    }
}
