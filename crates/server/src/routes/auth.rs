//! Login, logout and identity endpoints.
//!
//! The session is a plain cookie carrying the admin's email. Login checks
//! the credential store once; logout and `/me` never touch it.

use axum::{
    Json, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::AppForm;
use crate::middleware::SessionEmail;
use crate::middleware::session::{login_cookie, removal_cookie};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Login form body. Missing fields are treated as empty.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Verify credentials and set the session cookie.
///
/// POST /login
async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> Result<impl IntoResponse> {
    let admin = AuthService::new(state.admins())
        .login(&form.email, &form.password)
        .await?;

    // The stored email, not the submitted one, becomes the session value.
    let cookie = login_cookie(&state.config().cookie, admin.email.as_str());
    set_sentry_user(admin.email.as_str());

    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(json!({ "status": "success" })),
    ))
}

/// Clear the session cookie.
///
/// POST /logout
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    clear_sentry_user();
    let cookie = removal_cookie(&state.config().cookie);
    (
        [(SET_COOKIE, cookie.to_string())],
        Json(json!({ "status": "logged_out" })),
    )
}

/// Report the identity carried by the session cookie.
///
/// GET /me
async fn me(SessionEmail(email): SessionEmail) -> impl IntoResponse {
    Json(json!({ "email": email, "authenticated": true }))
}
