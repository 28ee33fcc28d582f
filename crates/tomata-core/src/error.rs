//! Core error types for tomata-core.
//!
//! Every fallible area of the library has its own thiserror enum, rolled up
//! into [`CoreError`] at the crate boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tomata-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] crate::sync::SyncError),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Local persistence errors.
///
/// Read failures are recoverable by design: callers fall back to an empty
/// session list or default statistics instead of crashing.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Store migration failed: {0}")]
    MigrationFailed(String),

    /// Stored blob could not be decoded
    #[error("Undecodable stored data under key '{key}': {message}")]
    Undecodable { key: String, message: String },

    /// Store is locked by another process
    #[error("Store is locked")]
    Locked,
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Notification delivery errors. Non-fatal by contract: the timer, history
/// and sync paths proceed normally when delivery fails.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The user denied notification permission
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Delivery failed for any other reason
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
