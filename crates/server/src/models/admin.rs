//! Admin credential domain type.

use secrecy::SecretString;

use sqlagent_core::Email;

/// An administrator record from the external credential store.
///
/// Read-only from this system's perspective. The password hash is a
/// bcrypt string (`$2a$`, `$2b$` or `$2y$`) and is redacted from `Debug`.
#[derive(Debug, Clone)]
pub struct AdminRecord {
    /// Admin's email address, exactly as stored.
    pub email: Email,
    /// Salted bcrypt hash of the admin's password.
    pub password_hash: SecretString,
    /// Whether the account may log in.
    pub enabled: bool,
}
