//! Common error types for the scene studio

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Could not read image: {0}")]
    ImageRead(String),

    #[error("Selection incomplete: {0}")]
    IncompleteSelection(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Generation endpoint returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Another request is already in progress")]
    ActionInFlight,

    #[error("Please wait before trying again")]
    ActionThrottled,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a generation attempt that failed with this error may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::HttpClient(_)
                | AppError::UpstreamStatus { .. }
                | AppError::MalformedResponse(_)
                | AppError::Json(_)
        )
    }
}

/// Error response format
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "upstream_error", None),
            AppError::ImageRead(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request_error", Some("unreadable_image")),
            AppError::IncompleteSelection(_) => (StatusCode::CONFLICT, "invalid_request_error", Some("incomplete_selection")),
            AppError::Upload(_) => (StatusCode::BAD_GATEWAY, "upstream_error", Some("upload_failed")),
            AppError::UpstreamStatus { .. } => (StatusCode::BAD_GATEWAY, "upstream_error", None),
            AppError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "upstream_error", Some("malformed_response")),
            AppError::RetriesExhausted { .. } => (StatusCode::BAD_GATEWAY, "upstream_error", Some("retries_exhausted")),
            AppError::Cancelled => (StatusCode::CONFLICT, "cancelled_error", Some("cancelled")),
            AppError::ActionInFlight => (StatusCode::CONFLICT, "invalid_request_error", Some("action_in_flight")),
            AppError::ActionThrottled => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", Some("action_throttled")),
            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", Some("session_not_found")),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", Some("rate_limit_exceeded")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
