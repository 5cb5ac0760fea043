//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, malformed email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but is not enabled.
    #[error("account disabled")]
    AccountDisabled,

    /// Credential store error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The password hasher could not run.
    #[error("password verifier error: {0}")]
    Verifier(String),
}
