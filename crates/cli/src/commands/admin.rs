//! Read-only admin account checks.
//!
//! # Environment Variables
//!
//! - `SQLAGENT_AUTH_DATABASE_URL` - MySQL connection string for the credential store

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use sqlagent_core::Email;
use sqlagent_server::db::{AdminStore, MySqlAdminStore, RepositoryError};
use sqlagent_server::services::{AuthError, AuthService};

use super::read_secret_line;

/// Errors that can occur during admin checks.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Credential store error.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Login check failed for a reason other than the account state.
    #[error("Verification error: {0}")]
    Auth(#[from] AuthError),

    /// No account with this email.
    #[error("No admin account for {0}")]
    NotFound(String),
}

/// Look up an admin and report its state, optionally verifying a password
/// read from stdin through the same path `/login` uses.
///
/// # Errors
///
/// Returns an error if the account does not exist, the store is unreachable,
/// or verification fails with an internal error.
pub async fn check(email: &str, verify_password: bool) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let database_url = std::env::var("SQLAGENT_AUTH_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("SQLAGENT_AUTH_DATABASE_URL"))?;
    let store = MySqlAdminStore::new(&database_url).map_err(AdminError::from)?;

    tracing::info!("Looking up admin: {}", email);
    let admin = store
        .find_by_email(&email)
        .await
        .map_err(AdminError::from)?
        .ok_or_else(|| AdminError::NotFound(email.to_string()))?;

    let hash = admin.password_hash.expose_secret();
    tracing::info!("  Email: {}", admin.email);
    tracing::info!("  Enabled: {}", admin.enabled);
    tracing::info!(
        "  Hash: {}",
        if hash.starts_with("$2") { "bcrypt" } else { "missing or not bcrypt" }
    );

    if !verify_password {
        return Ok(());
    }

    let password = read_secret_line()?;
    match AuthService::new(&store)
        .login(email.as_str(), password.expose_secret())
        .await
    {
        Ok(_) => tracing::info!("Password OK: /login would return 200"),
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Password rejected: /login would return 401");
        }
        Err(AuthError::AccountDisabled) => {
            tracing::warn!("Account disabled: /login would return 403");
        }
        Err(e) => return Err(AdminError::from(e).into()),
    }

    Ok(())
}
