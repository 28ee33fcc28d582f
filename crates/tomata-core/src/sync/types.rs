//! Core types for cloud session backup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Current sync status, exposed to display collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether a sync is currently in progress.
    pub in_progress: bool,
    /// Last fully successful sync.
    pub last_synced: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

/// What a successful reconciliation moved in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Remote-only sessions appended to the local store.
    pub pulled: usize,
    /// Local-only sessions pushed to the remote store.
    pub pushed: usize,
}

/// Sync error types.
///
/// `AccountUnavailable` (not signed in / no backup account) is deliberately
/// distinct from transient network failure: the former is user-actionable,
/// the latter is retried on the next explicit or foreground trigger.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No backup account configured or signed in")]
    AccountUnavailable,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
}
