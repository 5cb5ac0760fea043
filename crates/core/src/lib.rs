//! SQL agent gateway core - shared types library.
//!
//! This crate provides common types used across the gateway components:
//! - `server` - HTTP surface (login, logout, identity, agent endpoints)
//! - `cli` - Command-line tools for credential checks and memory seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Email addresses, resolved users and capability groups

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
