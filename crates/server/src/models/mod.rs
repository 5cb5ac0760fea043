//! Domain models for the gateway.

pub mod admin;

pub use admin::AdminRecord;
