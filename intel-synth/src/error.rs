//! HTTP error mapping for intel-synth
//!
//! Every domain error reaching a handler becomes a status code plus a
//! `{ success: false, error, code }` body.

use crate::pipeline::PipelineError;
use crate::renderers::RenderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required credential missing (503)
    #[error("{0}")]
    Configuration(String),

    /// Invalid request (400)
    #[error("{0}")]
    InvalidInput(String),

    /// Nothing to render from (400)
    #[error("{0}")]
    EmptyInput(String),

    /// External service failed (502)
    #[error("{0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidInput(_) | ApiError::EmptyInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "CONFIGURATION_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::EmptyInput(_) => "EMPTY_INPUT",
            ApiError::Upstream(_) => "UPSTREAM_FAILURE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(msg) => ApiError::Configuration(msg),
            PipelineError::InputValidation(msg) => ApiError::InvalidInput(msg),
            upstream @ PipelineError::UpstreamFailure(_) => ApiError::Upstream(upstream.to_string()),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        let message = err.to_string();
        match err {
            RenderError::MissingCredential(_) => ApiError::Configuration(message),
            RenderError::EmptyInput => ApiError::EmptyInput(message),
            RenderError::UpstreamFailure(_) | RenderError::MalformedUpstreamResponse(_) => {
                ApiError::Upstream(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
