//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password login against the admin credential store

pub mod auth;

pub use auth::{AuthError, AuthService};
