//! Error types for fixguard
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Fetch errors are kept separate from the crate-wide [`Error`] because the
//! residual check has to tell "no database configured" apart from a genuine
//! backend failure.

use crate::types::FixtureId;
use std::io;
use thiserror::Error;

/// Result type alias for fixguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading rows from a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No database connection is configured for the running test
    #[error("Database connection is not configured")]
    NotConfigured,

    /// The table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The backend failed while reading the table
    #[error("Failed to fetch rows from '{table}': {message}")]
    Backend {
        /// Table being read
        table: String,
        /// Backend error message
        message: String,
    },
}

impl FetchError {
    /// True when the error only means there is no database to read from
    pub fn is_not_configured(&self) -> bool {
        matches!(self, FetchError::NotConfigured)
    }
}

/// Errors raised by a fixture registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    /// No fixture with this identifier is registered
    #[error("Unknown fixture: {0}")]
    UnknownFixture(FixtureId),

    /// A fixture with this identifier is already registered
    #[error("Fixture already registered: {0}")]
    Duplicate(FixtureId),

    /// Applying the fixture failed
    #[error("Fixture '{fixture}' failed to apply: {message}")]
    ApplyFailed {
        /// Fixture that failed
        fixture: FixtureId,
        /// Failure message
        message: String,
    },

    /// Reverting the fixture failed
    #[error("Fixture '{fixture}' failed to revert: {message}")]
    RevertFailed {
        /// Fixture that failed
        fixture: FixtureId,
        /// Failure message
        message: String,
    },
}

/// Error types for fixguard
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Table read failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Fixture registry failure
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Transaction backend failure (begin/rollback)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Illegal lifecycle transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidState {
        /// State the machine was in
        from: String,
        /// State that was requested
        to: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
