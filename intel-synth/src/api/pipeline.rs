//! Pipeline run endpoint
//!
//! `POST /pipeline/run` performs extraction, search and aggregation for one
//! transcript. Credentials are checked before the transcript, so a service
//! without keys answers 503 without touching the network.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{PerformanceReport, PipelineRun, SynthesisPipeline};
use crate::types::{PipelineSettings, Query, SearchOutcome, TokenUsage};
use crate::AppState;

/// Pipeline run request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(flatten)]
    pub settings: PipelineSettings,
}

/// Roll-up over the search outcomes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    /// Aggregated corpus handed to renderers
    pub combined_results: String,
    pub successful_searches: usize,
    pub total_searches: usize,
    pub success_ratio: f64,
    pub generated_at: DateTime<Utc>,
}

/// Pipeline run response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub success: bool,
    pub run_id: Uuid,
    pub transcript: String,
    pub extracted_queries: Vec<Query>,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub search_results: Vec<SearchOutcome>,
    pub report_data: ReportData,
    pub performance: PerformanceReport,
    pub usage: TokenUsage,
    pub settings: PipelineSettings,
}

impl RunResponse {
    fn from_run(run: PipelineRun, transcript: String, settings: PipelineSettings) -> Self {
        let report_data = ReportData {
            combined_results: run.aggregate.corpus().to_string(),
            successful_searches: run.aggregate.len(),
            total_searches: run.aggregate.total(),
            success_ratio: run.aggregate.success_ratio(),
            generated_at: Utc::now(),
        };

        Self {
            success: true,
            run_id: run.run_id,
            transcript,
            extracted_queries: run.queries,
            used_fallback: run.used_fallback,
            fallback_reason: run.fallback_reason,
            search_results: run.outcomes,
            report_data,
            performance: run.performance,
            usage: run.usage,
            settings,
        }
    }
}

/// POST /pipeline/run
pub async fn run_pipeline(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> ApiResult<Json<RunResponse>> {
    let result = execute_run(&state, payload).await;
    state.track(result).await.map(Json)
}

async fn execute_run(
    state: &AppState,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> ApiResult<RunResponse> {
    let pipeline = SynthesisPipeline::new(&state.services, &state.models, &state.tuning)?;

    let request = json_body(payload)?;
    let transcript = request
        .transcript
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("transcript is required".to_string()))?;

    let run = pipeline.run(&transcript, &request.settings).await?;
    Ok(RunResponse::from_run(run, transcript, request.settings))
}

/// Build pipeline routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new().route("/pipeline/run", post(run_pipeline))
}
