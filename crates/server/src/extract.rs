//! Request extractors that reject with [`AppError`].
//!
//! Axum's own `Form`, `Json` and `Query` answer a bad request with a
//! plain-text body. These wrappers keep the status axum chose but send it
//! through `AppError`, so every failure carries the JSON `detail` envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// URL-encoded form body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct AppForm<T>(pub T);

/// JSON body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
