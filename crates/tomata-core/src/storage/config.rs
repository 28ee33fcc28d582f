//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - Phase durations and the long-break cadence
//! - Notification and sound flags
//! - Auto-start behavior for the next interval
//! - Cloud sync settings
//!
//! Configuration is stored at `~/.config/tomata/config.toml`. Durations are
//! minutes (fractional allowed); the sanitized accessors clamp non-positive
//! values back to the documented defaults so a zero- or negative-length
//! interval can never reach the state machine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::Phase;

/// Phase durations and long-break cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_min")]
    pub work_min: f64,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: f64,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: f64,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Auto-start behavior when a phase completes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoStartConfig {
    #[serde(default)]
    pub breaks: bool,
    #[serde(default)]
    pub pomodoros: bool,
}

/// Cloud backup configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the remote session store.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional bearer token for the remote store.
    #[serde(default)]
    pub token: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/tomata/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub auto_start: AutoStartConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_work_min() -> f64 {
    25.0
}
fn default_short_break_min() -> f64 {
    5.0
}
fn default_long_break_min() -> f64 {
    15.0
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_min: default_work_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

fn minutes_to_secs(minutes: f64, fallback_min: f64) -> u64 {
    let min = if minutes > 0.0 { minutes } else { fallback_min };
    (min * 60.0).round() as u64
}

impl TimerConfig {
    /// Work interval length in seconds, clamped to the default when the
    /// configured value is non-positive.
    pub fn work_secs(&self) -> u64 {
        minutes_to_secs(self.work_min, default_work_min())
    }

    pub fn short_break_secs(&self) -> u64 {
        minutes_to_secs(self.short_break_min, default_short_break_min())
    }

    pub fn long_break_secs(&self) -> u64 {
        minutes_to_secs(self.long_break_min, default_long_break_min())
    }

    /// Long-break cadence, falling back to the default when zero.
    pub fn cadence(&self) -> u32 {
        if self.sessions_until_long_break == 0 {
            default_sessions_until_long_break()
        } else {
            self.sessions_until_long_break
        }
    }

    /// Duration of one interval of `phase`, in seconds.
    pub fn duration_secs(&self, phase: Phase, long_break: bool) -> u64 {
        match phase {
            Phase::Work => self.work_secs(),
            Phase::Break if long_break => self.long_break_secs(),
            Phase::Break => self.short_break_secs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    // Nullable fields (sync endpoint/token) are strings.
                    serde_json::Value::Null => serde_json::Value::String(value.into()),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing and returning the defaults when no config
    /// file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()?;
        Ok(())
    }
}
