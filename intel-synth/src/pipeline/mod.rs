//! Intelligence synthesis pipeline
//!
//! # Architecture
//! - **Stage 1**: Extraction (transcript → search intents)
//! - **Stage 2**: Search (fan-out, isolated tasks, join-all)
//! - **Stage 3**: Aggregation (successful findings → rendering corpus)
//!
//! Rendering is not part of a run: renderers consume the [`Aggregate`]
//! independently, see [`crate::renderers`].
//!
//! # Error Handling
//! - Missing credentials fail before any stage runs
//! - Extraction decode problems degrade to a fallback query
//! - Search failures stay in-band as `success: false` outcomes
//!
//! # Example
//! ```rust,ignore
//! let pipeline = SynthesisPipeline::new(&services, &models, &tuning)?;
//! let run = pipeline.run(transcript, &settings).await?;
//! ```

pub mod aggregator;
pub mod executor;
pub mod extractor;
pub mod telemetry;

pub use aggregator::{aggregate, Aggregate};
pub use executor::SearchExecutor;
pub use extractor::{Decoded, Extraction, FallbackReason, QueryExtractor};
pub use telemetry::{PerformanceReport, PipelineTelemetry, StageTiming};

use crate::clients::{ClientError, Services};
use crate::config::ModelSettings;
use crate::types::{PipelineSettings, Query, SearchOutcome, TokenUsage};
use intel_common::config::PipelineTuning;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required credential absent; nothing was attempted
    #[error("{0}")]
    Configuration(String),

    /// Request rejected before any network call
    #[error("{0}")]
    InputValidation(String),

    /// The extraction call itself failed
    #[error("query extraction failed: {0}")]
    UpstreamFailure(#[source] ClientError),
}

/// Everything a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub queries: Vec<Query>,
    pub used_fallback: bool,
    /// Why extraction fell back, when it did
    pub fallback_reason: Option<String>,
    pub outcomes: Vec<SearchOutcome>,
    pub aggregate: Aggregate,
    pub performance: PerformanceReport,
    pub usage: TokenUsage,
}

pub struct SynthesisPipeline {
    extractor: QueryExtractor,
    executor: SearchExecutor,
    clamp_query_count: bool,
}

impl SynthesisPipeline {
    /// Build a pipeline, failing fast when a credential is missing
    pub fn new(
        services: &Services,
        models: &ModelSettings,
        tuning: &PipelineTuning,
    ) -> Result<Self, PipelineError> {
        let completion = services
            .completion()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        let search = services
            .search()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        Ok(Self {
            extractor: QueryExtractor::new(completion, models.extraction.clone()),
            executor: SearchExecutor::new(
                search,
                tuning.max_concurrent_searches,
                Duration::from_secs(tuning.search_timeout_secs),
            ),
            clamp_query_count: tuning.clamp_query_count,
        })
    }

    /// Run extraction, search and aggregation for one transcript
    pub async fn run(
        &self,
        transcript: &str,
        settings: &PipelineSettings,
    ) -> Result<PipelineRun, PipelineError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(PipelineError::InputValidation(
                "transcript must not be empty".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id);
        self.run_stages(run_id, transcript, settings)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        transcript: &str,
        settings: &PipelineSettings,
    ) -> Result<PipelineRun, PipelineError> {
        let mut telemetry = PipelineTelemetry::start(run_id);
        info!(
            transcript_chars = transcript.len(),
            query_count = settings.query_count,
            "Pipeline run started"
        );

        // Stage 1: Extraction
        let stage = Instant::now();
        let extraction = self
            .extractor
            .extract(transcript, settings.query_count)
            .await
            .map_err(PipelineError::UpstreamFailure)?;
        telemetry.record_stage(telemetry::STAGE_EXTRACTION, stage.elapsed());
        telemetry.add_usage(&extraction.token_usage);

        let mut queries = extraction.queries;
        if self.clamp_query_count && settings.query_count > 0 {
            queries.truncate(settings.query_count);
        }

        // Stage 2: Search (join barrier)
        let stage = Instant::now();
        let outcomes = self.executor.execute(&queries, settings).await;
        telemetry.record_stage(telemetry::STAGE_SEARCH, stage.elapsed());
        for outcome in &outcomes {
            telemetry.add_usage(&outcome.token_usage);
        }

        // Stage 3: Aggregation
        let stage = Instant::now();
        let aggregate = aggregate(&outcomes);
        telemetry.record_stage(telemetry::STAGE_AGGREGATION, stage.elapsed());

        let (performance, usage) = telemetry.finish(&outcomes);

        Ok(PipelineRun {
            run_id,
            queries,
            used_fallback: extraction.used_fallback,
            fallback_reason: extraction.fallback_reason.map(|r| r.to_string()),
            outcomes,
            aggregate,
            performance,
            usage,
        })
    }
}
