//! intel-synth library interface
//!
//! Exposes the pipeline, renderers and router for integration testing.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod renderers;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use crate::clients::Services;
use crate::config::ModelSettings;
use axum::Router;
use chrono::{DateTime, Utc};
use intel_common::config::PipelineTuning;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// External service clients; absent entries have no credential
    pub services: Services,
    pub models: ModelSettings,
    pub tuning: PipelineTuning,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last endpoint-level error, surfaced by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(services: Services, models: ModelSettings, tuning: PipelineTuning) -> Self {
        Self {
            services,
            models,
            tuning,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failed request for diagnostics
    pub async fn record_error(&self, err: &ApiError) {
        warn!(code = err.code(), error = %err, "Request failed");
        *self.last_error.write().await = Some(err.to_string());
    }

    /// Pass a handler result through, recording it when it failed
    pub async fn track<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(err) = &result {
            self.record_error(err).await;
        }
        result
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::pipeline_routes())
        .merge(api::format_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
