//! bcrypt password hashing and verification.
//!
//! Stored hashes are Devise-compatible bcrypt strings. bcrypt is deliberately
//! slow, so the async entry point runs on tokio's blocking pool.

use secrecy::{ExposeSecret, SecretString};

use super::AuthError;

/// Work factor used for newly generated hashes.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Check a plaintext candidate against a stored bcrypt hash.
///
/// The comparison is salted and constant-time. A malformed hash (wrong
/// prefix, bad length, unsupported cost) never matches.
#[must_use]
pub fn verify_password(candidate: &str, hash: &str) -> bool {
    match bcrypt::verify(candidate, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}

/// Verify a password on the blocking thread pool.
///
/// # Errors
///
/// Returns `AuthError::Verifier` if the blocking task panicked or was cancelled.
pub async fn verify_password_blocking(
    candidate: SecretString,
    hash: SecretString,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        verify_password(candidate.expose_secret(), hash.expose_secret())
    })
    .await
    .map_err(|e| AuthError::Verifier(e.to_string()))
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `AuthError::Verifier` if the cost is outside bcrypt's range (4-31).
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Verifier(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Minimum cost keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret", TEST_COST).unwrap();
        assert!(hash.starts_with("$2b$04$"));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_devise_2a_prefix_is_accepted() {
        // Devise writes `$2a$` hashes; the digest is identical to `$2b$`.
        let hash = hash_password("secret", TEST_COST).unwrap();
        let devise_hash = hash.replacen("$2b$", "$2a$", 1);
        assert!(verify_password("secret", &devise_hash));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "plaintext-secret"));
        assert!(!verify_password("secret", "$2b$04$tooshort"));
        assert!(!verify_password("secret", "$argon2id$v=19$m=19456,t=2,p=1$abc$def"));
    }

    #[test]
    fn test_invalid_cost_is_an_error() {
        assert!(matches!(
            hash_password("secret", 2),
            Err(AuthError::Verifier(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_on_blocking_pool() {
        let hash = hash_password("secret", TEST_COST).unwrap();
        let ok = verify_password_blocking(
            SecretString::from("secret"),
            SecretString::from(hash.clone()),
        )
        .await
        .unwrap();
        assert!(ok);

        let ok = verify_password_blocking(SecretString::from("nope"), SecretString::from(hash))
            .await
            .unwrap();
        assert!(!ok);
    }
}
