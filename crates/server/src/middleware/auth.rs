//! Authentication extractors.
//!
//! Two ways into a handler:
//!
//! - [`SessionEmail`] reads the cookie directly (used by `/me`)
//! - [`CurrentUser`] asks the agent's user resolver (used by agent endpoints)

use axum::{extract::FromRequestParts, http::request::Parts};

use sqlagent_core::User;

use super::session::read_session_email;
use crate::agent::RequestContext;
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires a non-empty session cookie.
///
/// Rejects with 401 `Not authenticated` otherwise. The value is returned
/// verbatim with no credential-store re-check.
pub struct SessionEmail(pub String);

impl FromRequestParts<AppState> for SessionEmail {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        read_session_email(&parts.headers, &state.config().cookie.name)
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Extractor that resolves the agent user for the request.
///
/// Rejects with 401 `AUTH_REQUIRED` when the resolver refuses the request.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = RequestContext::from_parts(parts);
        let user = state.agent().resolve_user(&context).await?;
        set_sentry_user(&user.email);
        Ok(Self(user))
    }
}
