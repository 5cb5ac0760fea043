//! Core types for the SQL agent gateway.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod user;

pub use email::{Email, EmailError};
pub use user::{ADMIN_GROUP, User};
