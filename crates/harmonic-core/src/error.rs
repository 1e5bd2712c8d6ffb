//! Core error types for harmonic-core.
//!
//! This module defines the error hierarchy using thiserror. Three kinds
//! matter to callers of the quota and badge components:
//!
//! - [`LookupError`]: the row store could not answer a count or read
//! - [`CoreError::QuotaExceeded`]: a business-rule rejection carrying the
//!   numbers needed for a friendly message
//! - [`ValidationError`]: the caller passed a malformed argument
//!
//! None of them is retried inside the library.

use std::path::PathBuf;
use thiserror::Error;

use crate::quota::QuotaSnapshot;

/// Core error type for harmonic-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The external row store could not complete a read
    #[error("Lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// The acting user has no requests left in the current window
    #[error("Request limit reached: {used} of {limit} requests used in the last {window_days} days")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        window_days: u32,
        snapshot: QuotaSnapshot,
    },

    /// Malformed track, negative count, out-of-range tier and friends
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A count or read against the row store failed.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The query could not be executed or its rows could not be decoded
    #[error("count query failed: {0}")]
    QueryFailed(String),

    /// The store is busy with another writer
    #[error("row store is locked")]
    Locked,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// No request row with the given id
    #[error("Request not found: {0}")]
    RequestNotFound(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Caller-side argument errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A user or request identifier was empty
    #[error("{field} must not be empty")]
    EmptyIdentifier { field: &'static str },

    /// Counts come from row counts and can never be negative
    #[error("count must be non-negative, got {0}")]
    NegativeCount(i64),

    /// Unknown badge track name
    #[error("unknown badge track '{0}' (expected give, receive or streak)")]
    UnknownTrack(String),

    /// Tier index outside the track's table
    #[error("tier {tier} is out of range for the {track} track (1..={max})")]
    TierOutOfRange { track: String, tier: i64, max: u8 },

    /// Unknown request status string
    #[error("unknown request status '{0}'")]
    UnknownStatus(String),

    /// Status change not permitted by the request lifecycle
    #[error("cannot move request from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Quota window length outside `1..=max` days
    #[error("quota window must be between 1 and {max} days, got {days}")]
    WindowOutOfRange { days: u32, max: u32 },

    /// A user cannot request their own offer
    #[error("requester and giver must differ (both were '{0}')")]
    SelfRequest(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for LookupError {
    fn from(err: rusqlite::Error) -> Self {
        match DatabaseError::from(err) {
            DatabaseError::Locked => LookupError::Locked,
            other => LookupError::QueryFailed(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
