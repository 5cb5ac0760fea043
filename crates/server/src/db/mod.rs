//! Credential store access.
//!
//! # Database: external MySQL (read-only)
//!
//! ## Tables
//!
//! - `admins` - Administrator accounts (`email`, `encrypted_password`, `is_enabled`)
//!
//! The table is owned by another application; this crate never writes to it
//! and never runs migrations against it.
//!
//! # Connections
//!
//! There is no pool. Each lookup opens a connection, runs one query and
//! closes the connection before returning, on success and on error alike.

pub mod admins;

use async_trait::async_trait;
use thiserror::Error;

use sqlagent_core::Email;

use crate::models::AdminRecord;

pub use admins::MySqlAdminStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Read-only access to administrator records.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Look up an admin by exact email. At most one record is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store cannot be reached or
    /// the query fails, `RepositoryError::DataCorruption` if the row is invalid.
    async fn find_by_email(&self, email: &Email) -> Result<Option<AdminRecord>, RepositoryError>;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store cannot be reached.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
