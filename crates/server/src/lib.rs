//! SQL agent gateway library.
//!
//! Cookie-based login in front of a conversational SQL agent. The crate is
//! a library so the router can be driven by integration tests; the binary
//! only adds configuration loading, telemetry and the listener.
//!
//! # Security
//!
//! The session cookie is unsigned and carries the admin's email. Any
//! non-empty value is admitted to the `admin` group, so deploy behind a
//! network boundary that only trusted clients can reach.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
