//! HTTP API handlers for intel-synth

pub mod format;
pub mod health;
pub mod pipeline;

pub use format::format_routes;
pub use health::health_routes;
pub use pipeline::pipeline_routes;

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, turning extractor rejections into `INVALID_INPUT`
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}
