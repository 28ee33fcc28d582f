use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;
use tomata_core::storage::history::LAST_SYNCED_KEY;
use tomata_core::{
    Config, EventBus, HistoryStore, HttpRemoteStore, SessionRecorder, SyncEngine, SyncError,
    SyncOutcome,
};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Run one reconciliation pass against the configured remote
    Now,
    /// Show sync configuration and the last successful sync
    Status,
}

#[derive(Serialize)]
struct StatusReport {
    enabled: bool,
    endpoint: Option<String>,
    last_synced: Option<String>,
}

/// One reconciliation pass. Shared with the config command, which triggers
/// a sync when backup is toggled on.
pub fn run_once(config: &Config, recorder: &SessionRecorder) -> Result<SyncOutcome, SyncError> {
    if !config.sync.enabled {
        return Err(SyncError::AccountUnavailable);
    }
    let remote = HttpRemoteStore::from_config(config)?;
    let engine = SyncEngine::with_persisted_marker(remote, Arc::new(EventBus::new()), recorder)?;
    engine.sync(recorder)
}

pub fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        SyncAction::Now => {
            let store = HistoryStore::open()?;
            let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
            let outcome = run_once(&config, &recorder)?;
            println!("synced: pulled {}, pushed {}", outcome.pulled, outcome.pushed);
        }
        SyncAction::Status => {
            let store = HistoryStore::open()?;
            let report = StatusReport {
                enabled: config.sync.enabled,
                endpoint: config.sync.endpoint.clone(),
                last_synced: store.kv_get(LAST_SYNCED_KEY)?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
