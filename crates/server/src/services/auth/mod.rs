//! Password login against the admin credential store.
//!
//! # Flow
//!
//! 1. Look up the admin by exact email (missing or malformed email is 401)
//! 2. Reject disabled accounts with 403 before touching the password
//! 3. Verify the password against the stored bcrypt hash (mismatch is 401)

mod error;
pub mod password;

pub use error::AuthError;
pub use password::{DEFAULT_COST, hash_password, verify_password};

use secrecy::SecretString;
use tracing::instrument;

use sqlagent_core::Email;

use crate::db::AdminStore;
use crate::models::AdminRecord;

/// Login service for administrators.
pub struct AuthService<'a> {
    admins: &'a dyn AdminStore,
}

impl<'a> AuthService<'a> {
    /// Create a new auth service.
    #[must_use]
    pub fn new(admins: &'a dyn AdminStore) -> Self {
        Self { admins }
    }

    /// Authenticate an admin by email and password.
    ///
    /// Returns the stored record on success; its email is the value to put
    /// in the session cookie.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - `AuthError::AccountDisabled` if the account is not enabled
    /// - `AuthError::Repository` if the credential store fails
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminRecord, AuthError> {
        // An email that could never be stored cannot match a row.
        let Ok(email) = Email::parse(email) else {
            tracing::info!("Login rejected: malformed email");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(admin) = self.admins.find_by_email(&email).await? else {
            tracing::info!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !admin.enabled {
            tracing::info!("Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        let matches = password::verify_password_blocking(
            SecretString::from(password.to_owned()),
            admin.password_hash.clone(),
        )
        .await?;

        if !matches {
            tracing::info!("Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!("Admin logged in");
        Ok(admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::db::RepositoryError;

    struct FakeStore {
        admins: HashMap<String, (String, bool)>,
        fail: bool,
    }

    impl FakeStore {
        fn with(email: &str, password: &str, enabled: bool) -> Self {
            let hash = hash_password(password, 4).unwrap();
            let mut admins = HashMap::new();
            admins.insert(email.to_string(), (hash, enabled));
            Self {
                admins,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl AdminStore for FakeStore {
        async fn find_by_email(
            &self,
            email: &Email,
        ) -> Result<Option<AdminRecord>, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::DataCorruption("boom".to_string()));
            }
            Ok(self
                .admins
                .get(email.as_str())
                .map(|(hash, enabled)| AdminRecord {
                    email: email.clone(),
                    password_hash: SecretString::from(hash.clone()),
                    enabled: *enabled,
                }))
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_success_returns_stored_email() {
        let store = FakeStore::with("a@x.com", "pw", true);
        let admin = AuthService::new(&store).login("a@x.com", "pw").await.unwrap();
        assert_eq!(admin.email.as_str(), "a@x.com");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = FakeStore::with("a@x.com", "pw", true);
        let err = AuthService::new(&store)
            .login("a@x.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_and_malformed_email() {
        let store = FakeStore::with("a@x.com", "pw", true);
        let service = AuthService::new(&store);

        for email in ["b@x.com", "", "no-at-sign", "A@x.com"] {
            let err = service.login(email, "pw").await.unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidCredentials),
                "expected 401 for {email:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_login_disabled_account_checked_before_password() {
        let store = FakeStore::with("a@x.com", "pw", false);
        let service = AuthService::new(&store);

        // Disabled wins even with a wrong password.
        let err = service.login("a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
        let err = service.login("a@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn test_login_malformed_stored_hash_is_invalid_credentials() {
        let mut store = FakeStore::with("a@x.com", "pw", true);
        store
            .admins
            .insert("a@x.com".to_string(), ("not-a-hash".to_string(), true));
        let err = AuthService::new(&store)
            .login("a@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_store_failure_propagates() {
        let mut store = FakeStore::with("a@x.com", "pw", true);
        store.fail = true;
        let err = AuthService::new(&store)
            .login("a@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Repository(_)));
    }
}
