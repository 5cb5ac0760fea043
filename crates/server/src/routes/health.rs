//! Liveness and readiness probes.

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the credential store (and the query database, when configured)
/// answers. Returns 503 Service Unavailable otherwise.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = state.admins().ping().await {
        tracing::warn!(error = %e, "Credential store not ready");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Some(sql) = state.sql_runner()
        && let Err(e) = sql.ping().await
    {
        tracing::warn!(error = %e, "Query database not ready");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
