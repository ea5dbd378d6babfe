use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures a proxied request can run into, from input validation through to
/// the upstream call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("TMDB_API_KEY is not configured")]
    Config,
    #[error("TMDB returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("TMDB request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("TMDB response did not match the expected shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// JSON error body returned to callers: `{"error": "..."}`.
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
