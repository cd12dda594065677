//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Client-facing bodies are always
//! `{"error": "..."}` with sanitized messages - internal details, stack
//! traces, and secrets never leave the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::UpstreamError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid input from the client.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid session for the shop.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream rate limit, surfaced to the widget for client-side backoff.
    #[error("Rate limited")]
    RateLimited,

    /// Upstream call did not complete before the deadline.
    #[error("Upstream timeout")]
    UpstreamTimeout,

    /// Upstream call failed in a non-retryable way.
    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UpstreamError> for AppError {
    /// Map a normalized upstream failure to a response category by kind:
    /// rate limit → 429, timeout → 504, upstream 404 → 404, other upstream
    /// 4xx → 400 (we sent something the API rejected), everything else → 500.
    fn from(err: UpstreamError) -> Self {
        match err.status {
            Some(429) => Self::RateLimited,
            Some(504) => Self::UpstreamTimeout,
            Some(404) => Self::NotFound("upstream resource not found".to_owned()),
            Some(status) if (400..500).contains(&status) => Self::Validation(err.message),
            _ if err.is_timeout() => Self::UpstreamTimeout,
            _ => Self::Upstream(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_) | Self::Upstream(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) | Self::Internal(_) | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Validation(msg) | Self::Unauthorized(msg) | Self::NotFound(msg) => msg.clone(),
            Self::RateLimited => "Rate limited, please retry shortly".to_owned(),
            Self::UpstreamTimeout => "Upstream service timed out".to_owned(),
            Self::Upstream(_) => "External service error".to_owned(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_map_to_status_by_kind() {
        assert!(matches!(
            AppError::from(UpstreamError::rate_limited(Some(2))),
            AppError::RateLimited
        ));
        assert!(matches!(
            AppError::from(UpstreamError::timed_out(std::time::Duration::from_secs(10))),
            AppError::UpstreamTimeout
        ));
        assert!(matches!(
            AppError::from(UpstreamError::from_status(404, "")),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(UpstreamError::from_status(422, "bad input")),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(UpstreamError::from_status(500, "boom")),
            AppError::Upstream(_)
        ));
        assert!(matches!(
            AppError::from(UpstreamError::other("mystery")),
            AppError::Upstream(_)
        ));
    }
}
