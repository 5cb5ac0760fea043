//! Static entry page.

use axum::{
    Router,
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::get,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Build the index router.
pub fn router() -> Router<AppState> {
    Router::new().route("/index", get(index))
}

/// Serve the configured index file.
///
/// GET /index
async fn index(State(state): State<AppState>, request: Request) -> Result<Response> {
    let path = &state.config().index_file;
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::NotFound("Index file not found".to_string()));
    }

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}
