//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Health
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (credential store reachable)
//!
//! # Session
//! POST /login                  - Form login, sets the session cookie
//! POST /logout                 - Clears the session cookie
//! GET  /me                     - Identity carried by the cookie
//!
//! # Static
//! GET  /index                  - Entry page
//!
//! # Agent (user resolved from the session cookie)
//! GET  /api/agent/tools        - Tools available to the user
//! POST /api/agent/chat         - Ask the agent (SSE or JSON)
//! GET  /api/agent/memories     - Recent agent memories
//! POST /api/agent/memories     - Save a text memory
//! ```

pub mod agent;
pub mod auth;
pub mod health;
pub mod index;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the complete application router.
///
/// Sentry layers are added by the binary so tests can use the bare router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    let router = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(index::router())
        .nest("/api/agent", agent::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        request_id = %uuid::Uuid::new_v4(),
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        );

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

/// CORS for the configured origins, with credentials allowed.
///
/// Returns `None` when no origins are configured (same-origin only).
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring CORS origin that is not a valid header value");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}
