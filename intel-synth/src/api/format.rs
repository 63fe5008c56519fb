//! Output format endpoints
//!
//! Each endpoint takes the `searchResults` of an earlier run, re-derives the
//! aggregate, and renders a single artifact. Formats never call each other,
//! so any subset can be requested in any order.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Instant;

use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{aggregate, Aggregate};
use crate::renderers::{
    BriefRenderer, EmailRenderer, PodcastOptions, PodcastRenderer, ReportRenderer, TextArtifact,
};
use crate::types::{default_report_style, SearchOutcome, TokenUsage};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledFormatRequest {
    #[serde(default)]
    pub search_results: Vec<SearchOutcome>,
    #[serde(default = "default_report_style")]
    pub report_style: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFormatRequest {
    #[serde(default)]
    pub search_results: Vec<SearchOutcome>,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastFormatRequest {
    #[serde(default)]
    pub search_results: Vec<SearchOutcome>,
    #[serde(flatten)]
    pub options: PodcastOptions,
}

/// Timing for a single render
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPerformance {
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub model: String,
    pub attempts: usize,
    pub successful_searches: usize,
    pub total_searches: usize,
}

fn format_response(
    key: &str,
    artifact: Value,
    performance: RenderPerformance,
    usage: Option<TokenUsage>,
) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(key.to_string(), artifact);
    body.insert("performance".to_string(), json!(performance));
    body.insert("usage".to_string(), json!(usage.unwrap_or_default()));
    Json(Value::Object(body))
}

fn to_value<T: Serialize>(artifact: &T) -> ApiResult<Value> {
    serde_json::to_value(artifact)
        .map_err(|e| ApiError::Internal(format!("failed to encode artifact: {}", e)))
}

fn text_response(
    key: &str,
    artifact: TextArtifact,
    aggregate: &Aggregate,
    started: Instant,
) -> ApiResult<Json<Value>> {
    let performance = RenderPerformance {
        total_duration_ms: started.elapsed().as_millis() as u64,
        render_duration_ms: artifact.render_duration_ms,
        model: artifact.model.clone(),
        attempts: artifact.attempts,
        successful_searches: aggregate.len(),
        total_searches: aggregate.total(),
    };
    Ok(format_response(key, to_value(&artifact)?, performance, artifact.token_usage))
}

/// POST /pipeline/format/brief
pub async fn format_brief(
    State(state): State<AppState>,
    payload: Result<Json<StyledFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let result = render_brief(&state, payload).await;
    state.track(result).await
}

async fn render_brief(
    state: &AppState,
    payload: Result<Json<StyledFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    let started = Instant::now();
    let aggregate = aggregate(&request.search_results);
    let artifact = BriefRenderer::new(&state.services, &state.models)
        .render(&aggregate, &request.report_style)
        .await?;
    text_response("brief", artifact, &aggregate, started)
}

/// POST /pipeline/format/email
pub async fn format_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let result = render_email(&state, payload).await;
    state.track(result).await
}

async fn render_email(
    state: &AppState,
    payload: Result<Json<EmailFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    let started = Instant::now();
    let aggregate = aggregate(&request.search_results);
    let recipient = request.recipient.unwrap_or_default();
    let artifact = EmailRenderer::new(&state.services, &state.models)
        .render(&aggregate, &recipient)
        .await?;
    text_response("email", artifact, &aggregate, started)
}

/// POST /pipeline/format/report
pub async fn format_report(
    State(state): State<AppState>,
    payload: Result<Json<StyledFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let result = render_report(&state, payload).await;
    state.track(result).await
}

async fn render_report(
    state: &AppState,
    payload: Result<Json<StyledFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    let started = Instant::now();
    let aggregate = aggregate(&request.search_results);
    let artifact = ReportRenderer::new(&state.services, &state.models)
        .render(&aggregate, &request.report_style)
        .await?;
    text_response("report", artifact, &aggregate, started)
}

/// POST /pipeline/format/podcast
pub async fn format_podcast(
    State(state): State<AppState>,
    payload: Result<Json<PodcastFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let result = render_podcast(&state, payload).await;
    state.track(result).await
}

async fn render_podcast(
    state: &AppState,
    payload: Result<Json<PodcastFormatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    let started = Instant::now();
    let aggregate = aggregate(&request.search_results);
    let artifact = PodcastRenderer::new(&state.services, &state.models)
        .render(&aggregate, &request.options)
        .await?;

    let performance = RenderPerformance {
        total_duration_ms: started.elapsed().as_millis() as u64,
        render_duration_ms: artifact.render_duration_ms,
        model: artifact.model.clone(),
        attempts: artifact.attempts,
        successful_searches: aggregate.len(),
        total_searches: aggregate.total(),
    };
    Ok(format_response(
        "podcast",
        to_value(&artifact)?,
        performance,
        artifact.token_usage,
    ))
}

/// Build format routes
pub fn format_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/format/brief", post(format_brief))
        .route("/pipeline/format/email", post(format_email))
        .route("/pipeline/format/report", post(format_report))
        .route("/pipeline/format/podcast", post(format_podcast))
}
