//! Application configuration, read from a JSON file.
//!
//! The file is optional: a missing file gives the defaults and a malformed one gives
//! the defaults plus a warning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "FLASHMASTER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "flashmaster.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Delay before moving on after a card is marked as mastered.
    #[serde(default = "default_auto_advance_delay_ms")]
    pub auto_advance_delay_ms: u64,
    /// `env_logger` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_database_path() -> PathBuf {
    PathBuf::from("flashmaster.sqlite3")
}

fn default_auto_advance_delay_ms() -> u64 {
    500
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_window_width() -> f32 {
    520.0
}

fn default_window_height() -> f32 {
    720.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            auto_advance_delay_ms: default_auto_advance_delay_ms(),
            log_filter: default_log_filter(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl AppConfig {
    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}

/// `$FLASHMASTER_CONFIG` if set, otherwise `flashmaster.json` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Settles a [`read_config`] result, falling back to the defaults.
///
/// Kept apart from the read so the binary can install its logger (whose filter
/// comes from the config) before the outcome is logged.
pub fn config_or_default(path: &Path, result: Result<AppConfig, ConfigError>) -> AppConfig {
    match result {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            AppConfig::default()
        }
        Err(e) => {
            log::warn!("Failed to load config {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}
