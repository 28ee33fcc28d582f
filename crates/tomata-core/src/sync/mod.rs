//! Cloud backup of the session history.
//!
//! Sync is triggered explicitly (a user action), when the app returns to the
//! foreground with sync enabled, and when sync is toggled on. Each trigger
//! runs one reconciliation pass via [`SyncEngine::sync`].

pub mod client;
pub mod engine;
pub mod types;

pub use client::{HttpRemoteStore, RemoteStore};
pub use engine::SyncEngine;
pub use types::{SyncError, SyncOutcome, SyncStatus};
