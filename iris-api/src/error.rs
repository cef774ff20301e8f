//! Error types for iris-api
//!
//! Auth, history and article endpoints answer failures with a `{message}`
//! body; the analysis endpoints answer with `{error}`. A 429 additionally
//! carries `lockoutUntil` so the client can show its countdown.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400, `{message}`)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Bad credentials, missing or unknown token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Account is locked after repeated password failures (429)
    #[error("{message}")]
    Locked {
        message: String,
        lockout_until: DateTime<Utc>,
    },

    /// Per-client request quota exhausted (429)
    #[error("Rate limited until {retry_at}")]
    RateLimited { retry_at: DateTime<Utc> },

    /// Rejected analysis upload (400, `{error}`)
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Inference or interpretation service failed (502, `{error}`)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Analysis could not be completed locally (500, `{error}`)
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// iris-common error
    #[error("Common error: {0}")]
    Common(#[from] iris_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Locked { .. } | ApiError::RateLimited { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::AnalysisFailed(_)
            | ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Other(_)
            | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details go to the log, not to the client
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("Request failed: {}", self);
        }

        let body = match self {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) | ApiError::NotFound(msg) => {
                json!({ "message": msg })
            }
            ApiError::Locked {
                message,
                lockout_until,
            } => json!({ "message": message, "lockoutUntil": lockout_until }),
            ApiError::RateLimited { retry_at } => json!({
                "message": "Too many requests, please try again later",
                "lockoutUntil": retry_at,
            }),
            ApiError::InvalidUpload(msg) | ApiError::Upstream(msg) => json!({ "error": msg }),
            ApiError::AnalysisFailed(_) => json!({ "error": "Analysis failed" }),
            ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Other(_)
            | ApiError::Common(_) => json!({ "message": "Server error occurred" }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
