pub mod config;
pub mod history;

pub use config::Config;
pub use history::HistoryStore;

use std::path::PathBuf;

/// Returns `~/.config/tomata[-dev]/` based on TOMATA_ENV.
///
/// Set TOMATA_ENV=dev to use a separate development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TOMATA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("tomata-dev")
    } else {
        base_dir.join("tomata")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
