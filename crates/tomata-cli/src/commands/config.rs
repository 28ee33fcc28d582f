use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use tomata_core::storage::history::ENGINE_KEY;
use tomata_core::{Config, EventBus, HistoryStore, SessionRecorder, TimerEngine};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.work_min", "notifications.sound")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

/// Let a persisted timer adopt the new configuration. A running interval
/// keeps its duration and raises the restart advisory; a paused one is
/// recomputed in full.
fn apply_to_engine(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = HistoryStore::open()?;
    let Some(json) = store.kv_get(ENGINE_KEY)? else {
        return Ok(());
    };
    let Ok(mut engine) = serde_json::from_str::<TimerEngine>(&json) else {
        return Ok(());
    };
    engine.apply_config(config, Utc::now());
    store.kv_set(ENGINE_KEY, &serde_json::to_string(&engine)?)?;
    Ok(())
}

/// Turning sync on triggers an immediate pass; failure is advisory only.
fn sync_if_toggled_on(config: &Config, key: &str, value: &str) {
    if key != "sync.enabled" || value != "true" {
        return;
    }
    let result = HistoryStore::open()
        .map_err(|e| e.to_string())
        .and_then(|store| {
            let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
            super::sync::run_once(config, &recorder).map_err(|e| e.to_string())
        });
    match result {
        Ok(outcome) => println!("synced: pulled {}, pushed {}", outcome.pulled, outcome.pushed),
        Err(e) => eprintln!("warning: sync failed: {e}"),
    }
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default();
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_or_default();
            config.set(&key, &value)?;
            apply_to_engine(&config)?;
            sync_if_toggled_on(&config, &key, &value);
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load_or_default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            apply_to_engine(&config)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
