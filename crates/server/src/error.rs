//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and logged before a generic body is sent to the client;
//! authentication failures map to 401 and disabled accounts to 403.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::agent::{AgentError, ResolveError};
use crate::db::RepositoryError;
use crate::llm::LlmError;
use crate::services::auth::AuthError;

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The agent could not resolve a user for the request.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Agent operation failed.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The request body or query string could not be extracted.
    #[error("Rejected request ({status}): {message}")]
    Rejected {
        /// Status chosen by the extractor (400, 415, 422, ...).
        status: StatusCode,
        /// Extractor's explanation.
        message: String,
    },
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AccountDisabled => StatusCode::FORBIDDEN,
                AuthError::Repository(_) | AuthError::Verifier(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Resolve(ResolveError::AuthRequired) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Agent(err) => match err {
                AgentError::ToolNotPermitted(_) => StatusCode::FORBIDDEN,
                AgentError::EmptyMessage => StatusCode::BAD_REQUEST,
                AgentError::Llm(LlmError::RateLimited { .. }) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                AgentError::Llm(_) => StatusCode::BAD_GATEWAY,
                AgentError::Memory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
        }
    }

    /// Client-facing message. Internal details are never exposed.
    pub(crate) fn detail(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::AccountDisabled => "Account disabled".to_string(),
                AuthError::Repository(_) | AuthError::Verifier(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Resolve(ResolveError::AuthRequired) => "AUTH_REQUIRED".to_string(),
            Self::Agent(err) => match err {
                AgentError::ToolNotPermitted(tool) => {
                    format!("Access to tool '{tool}' is not permitted")
                }
                AgentError::EmptyMessage => "Message cannot be empty".to_string(),
                AgentError::Llm(LlmError::RateLimited { .. }) => {
                    "LLM rate limited, try again later".to_string()
                }
                AgentError::Llm(_) => "External service error".to_string(),
                AgentError::Memory(_) => "Internal server error".to_string(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Rejected { message: msg, .. } => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the session email.
///
/// Call this after the user is resolved to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(email.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
