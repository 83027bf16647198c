//! Error types for reel-gen
//!
//! Two families:
//! - [`ApiError`]: what HTTP handlers return (mapped to status codes)
//! - [`PipelineError`]: what generation stages return; recoverable variants
//!   degrade a single segment, everything else fails the job

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::job_registry::RegistryError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Too many active jobs (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// reel-common error
    #[error("Common error: {0}")]
    Common(#[from] reel_common::Error),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ApiError::NotFound(format!("Job not found: {}", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Generation pipeline error taxonomy
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Plan missing, unparseable or invalid (fatal)
    #[error("Planning failed: {0}")]
    Planning(String),

    /// Narration for one segment failed on every provider (recoverable: silence)
    #[error("Narration failed for segment {}: {message}", segment + 1)]
    Synthesis { segment: usize, message: String },

    /// Duration probe failed for one asset (recoverable: estimated duration)
    #[error("Duration probe failed for segment {}: {message}", segment + 1)]
    Probe { segment: usize, message: String },

    /// Composition invariant violated while building the graph (fatal defect)
    #[error("Composition failed: {0}")]
    Compilation(String),

    /// Encoding backend failed or produced no artifact (fatal)
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Filesystem error in the job workspace (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Recoverable errors degrade a single segment; the job continues
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Synthesis { .. } | PipelineError::Probe { .. })
    }
}
