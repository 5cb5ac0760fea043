//! Request-level session handling.
//!
//! - `session` - Build and read the session cookie
//! - `auth` - Extractors that admit requests carrying a session

pub mod auth;
pub mod session;

pub use auth::{CurrentUser, SessionEmail};
