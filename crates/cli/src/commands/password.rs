//! Password hashing for provisioning admin rows.

use std::io::Write;

use secrecy::ExposeSecret;

use sqlagent_server::services::auth::hash_password;

use super::read_secret_line;

/// Read a password from stdin and print its bcrypt hash to stdout.
///
/// # Errors
///
/// Returns an error if stdin is empty or the cost is out of range.
pub fn hash(cost: u32) -> Result<(), Box<dyn std::error::Error>> {
    let password = read_secret_line()?;
    let hash = hash_password(password.expose_secret(), cost)?;
    writeln!(std::io::stdout().lock(), "{hash}")?;
    tracing::info!(cost, "Password hashed");
    Ok(())
}
