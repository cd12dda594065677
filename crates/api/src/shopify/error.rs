//! Upstream error normalization.
//!
//! Heterogeneous failure shapes (transport errors, GraphQL error arrays,
//! bare HTTP statuses, API error envelopes) are decoded here into one
//! canonical [`UpstreamError`]. Decision order:
//!
//! 1. a GraphQL-style errors array uses the first error's message and
//!    extension code, with retryability taken from the HTTP status
//! 2. a bare status code builds a generic HTTP error message
//! 3. anything else falls back to the source error's own message (or
//!    "unknown error") and is never retryable

use serde::Deserialize;
use thiserror::Error;

/// A normalized upstream failure.
///
/// Produced once per failed call at the HTTP client boundary; consumed by the
/// retry wrapper (which reads `retryable`) and by response mapping (which
/// reads `status`). Never persisted.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// Human-readable description, safe to log but not to return verbatim.
    pub message: String,
    /// Machine-readable code when the upstream supplied one
    /// (e.g. GraphQL extension codes like `THROTTLED`).
    pub code: Option<String>,
    /// HTTP status of the failed response, when one was received.
    pub status: Option<u16>,
    /// Whether the retry wrapper may attempt the call again.
    pub retryable: bool,
}

/// True iff a status code is worth retrying.
///
/// Rate limiting and upstream unavailability/timeouts are transient; every
/// other status - including the remaining 4xx client errors - is not.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 503 | 504)
}

fn message_sounds_transient(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("network") || lowered.contains("timeout")
}

impl UpstreamError {
    /// Normalize a GraphQL errors array (decision order step 1).
    ///
    /// The first error's message and extension code win; retryability comes
    /// from the HTTP status the errors arrived with.
    #[must_use]
    pub fn from_graphql(status: u16, errors: &[GraphQLErrorResponse]) -> Self {
        let first = errors.first();
        let message = first
            .map_or_else(|| "GraphQL error (no details provided)".to_owned(), |e| e.message.clone());
        let code = first.and_then(|e| e.extensions.code.clone());

        Self {
            retryable: is_retryable_status(status),
            message,
            code,
            status: Some(status),
        }
    }

    /// Normalize a non-success HTTP response (decision order step 2).
    #[must_use]
    pub fn from_status(status: u16, body_snippet: &str) -> Self {
        let snippet: String = body_snippet.chars().take(200).collect();
        let message = if snippet.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {snippet}")
        };

        Self {
            retryable: is_retryable_status(status),
            message,
            code: None,
            status: Some(status),
        }
    }

    /// Rate limited, with the upstream's requested delay when it sent one.
    #[must_use]
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        let message = retry_after_secs.map_or_else(
            || "rate limited".to_owned(),
            |secs| format!("rate limited, retry after {secs} seconds"),
        );

        Self {
            message,
            code: Some("THROTTLED".to_owned()),
            status: Some(429),
            retryable: true,
        }
    }

    /// The operation did not complete before its deadline.
    #[must_use]
    pub fn timed_out(after: std::time::Duration) -> Self {
        Self {
            message: format!("operation timed out after {}ms", after.as_millis()),
            code: None,
            status: None,
            retryable: true,
        }
    }

    /// Fallback for everything else (decision order step 3): never retryable.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            "unknown error".to_owned()
        } else {
            message
        };

        Self {
            message,
            code: None,
            status: None,
            retryable: false,
        }
    }

    /// True when this error describes an upstream timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status == Some(504) || self.message.to_lowercase().contains("timeout")
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();

        // Transport-level failures carry no status; classify by shape first,
        // then by the message heuristic (mentions of "network"/"timeout").
        let retryable = err.is_timeout()
            || err.is_connect()
            || status.is_some_and(is_retryable_status)
            || message_sounds_transient(&message);

        Self {
            message,
            code: None,
            status,
            retryable,
        }
    }
}

/// GraphQL response envelope shared by all raw-document queries.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLErrorResponse>>,
}

/// A single error from a GraphQL errors array.
#[derive(Debug, Deserialize)]
pub struct GraphQLErrorResponse {
    pub message: String,
    #[serde(default)]
    pub extensions: GraphQLExtensions,
}

/// The `extensions` object Shopify attaches to GraphQL errors.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQLExtensions {
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_are_exactly_429_503_504() {
        for status in [429, 503, 504] {
            assert!(is_retryable_status(status), "{status} should be retryable");
        }
        for status in [400, 401, 403, 404, 422, 500, 502] {
            assert!(!is_retryable_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn graphql_errors_use_first_message_and_code() {
        let errors = vec![
            GraphQLErrorResponse {
                message: "Throttled".to_owned(),
                extensions: GraphQLExtensions {
                    code: Some("THROTTLED".to_owned()),
                },
            },
            GraphQLErrorResponse {
                message: "ignored".to_owned(),
                extensions: GraphQLExtensions::default(),
            },
        ];

        let err = UpstreamError::from_graphql(429, &errors);
        assert_eq!(err.message, "Throttled");
        assert_eq!(err.code.as_deref(), Some("THROTTLED"));
        assert_eq!(err.status, Some(429));
        assert!(err.retryable);

        let err = UpstreamError::from_graphql(400, &errors);
        assert!(!err.retryable, "4xx GraphQL errors do not retry");
    }

    #[test]
    fn bare_statuses_build_generic_messages() {
        let err = UpstreamError::from_status(503, "upstream unavailable");
        assert_eq!(err.message, "HTTP 503: upstream unavailable");
        assert!(err.retryable);

        let err = UpstreamError::from_status(404, "");
        assert_eq!(err.message, "HTTP 404");
        assert!(!err.retryable);
    }

    #[test]
    fn fallback_is_never_retryable_and_never_empty() {
        let err = UpstreamError::other("");
        assert_eq!(err.message, "unknown error");
        assert!(!err.retryable);

        let err = UpstreamError::other("boom");
        assert_eq!(err.message, "boom");
        assert!(!err.retryable);
    }

    #[test]
    fn timeouts_are_retryable_and_recognizable() {
        let err = UpstreamError::timed_out(std::time::Duration::from_secs(10));
        assert!(err.retryable);
        assert!(err.is_timeout());
        assert!(err.message.contains("10000ms"));
    }

    #[test]
    fn envelope_deserializes_with_and_without_errors() {
        #[derive(Debug, Deserialize)]
        struct Data {
            ok: bool,
        }

        let json = r#"{"data": {"ok": true}}"#;
        let resp: GraphQLResponse<Data> = serde_json::from_str(json).expect("deserialize");
        assert!(resp.data.expect("data").ok);
        assert!(resp.errors.is_none());

        let json = r#"{"errors": [{"message": "boom", "extensions": {"code": "INTERNAL"}}]}"#;
        let resp: GraphQLResponse<Data> = serde_json::from_str(json).expect("deserialize");
        assert!(resp.data.is_none());
        let errors = resp.errors.expect("errors");
        assert_eq!(errors.first().map(|e| e.message.as_str()), Some("boom"));
    }
}
