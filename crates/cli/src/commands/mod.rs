//! CLI command implementations.

pub mod admin;
pub mod memory;
pub mod password;

use std::io::BufRead;

use secrecy::SecretString;

/// Read one line from stdin as a secret, without the trailing newline.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or the line is empty.
pub fn read_secret_line() -> Result<SecretString, Box<dyn std::error::Error>> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        return Err("no password on stdin".into());
    }
    Ok(SecretString::from(secret.to_owned()))
}
