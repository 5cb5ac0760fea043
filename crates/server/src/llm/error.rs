//! Failures reported by the Anthropic backend.
//!
//! The API describes a failure as `{"type": "error", "error": {"type", "message"}}`,
//! either as the body of a non-success response or as an `error` event in
//! the middle of a stream. Both shapes decode through [`ErrorBody`].

use serde::Deserialize;
use thiserror::Error;

/// Seconds to wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors from an LLM backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("{kind}: {message}")]
    Api {
        /// Anthropic error type, or `http_<status>` for an unrecognized body.
        kind: String,
        /// Human-readable reason.
        message: String,
    },

    /// Too many requests.
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited {
        /// Seconds the backend asked us to wait.
        retry_after: u64,
    },

    /// The API key was refused.
    #[error("API key rejected")]
    Unauthorized,

    /// A response or stream event did not match the expected shape.
    #[error("malformed response: {0}")]
    Parse(String),

    /// The stream broke off before the message finished.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The client could not be constructed.
    #[error("client configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Classify a non-success response from its status, `Retry-After` header
    /// and body.
    pub(crate) fn from_status(status: u16, retry_after: Option<&str>, body: &str) -> Self {
        match status {
            429 => Self::RateLimited {
                retry_after: retry_after
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            401 => Self::Unauthorized,
            _ => match serde_json::from_str::<ErrorEnvelope>(body) {
                Ok(envelope) => envelope.error.into(),
                Err(_) => Self::Api {
                    kind: format!("http_{status}"),
                    message: body.trim().to_owned(),
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// The `error` object of a failure, in a body or a stream event.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Anthropic error type, e.g. `overloaded_error`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable reason.
    pub message: String,
}

impl From<ErrorBody> for LlmError {
    fn from(body: ErrorBody) -> Self {
        Self::Api {
            kind: body.kind,
            message: body.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_uses_retry_after() {
        let err = LlmError::from_status(429, Some(" 12 "), "");
        assert!(matches!(err, LlmError::RateLimited { retry_after: 12 }));

        let err = LlmError::from_status(429, Some("Wed, 21 Oct 2026 07:28:00 GMT"), "");
        assert!(matches!(err, LlmError::RateLimited { retry_after: 60 }));
    }

    #[test]
    fn test_unauthorized_ignores_body() {
        let err = LlmError::from_status(401, None, "{\"anything\": true}");
        assert!(matches!(err, LlmError::Unauthorized));
    }

    #[test]
    fn test_error_envelope_becomes_api_error() {
        let body = r#"{
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }"#;
        let err = LlmError::from_status(529, None, body);
        assert_eq!(err.to_string(), "overloaded_error: Overloaded");
    }

    #[test]
    fn test_unrecognized_body_keeps_status() {
        let err = LlmError::from_status(502, None, "<html>Bad Gateway</html>\n");
        match err {
            LlmError::Api { kind, message } => {
                assert_eq!(kind, "http_502");
                assert_eq!(message, "<html>Bad Gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
