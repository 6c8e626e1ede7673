//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calsync/config.toml` by default:
//!
//! ```toml
//! debug = false
//! log_format = "compact"
//!
//! [sync]
//! window_days = 30
//! mapping_path = "/home/me/.local/share/calsync/mapping.txt"
//!
//! [source]
//! path = "/home/me/calendars/notes.json"
//!
//! [destination]
//! path = "/home/me/calendars/outlook.json"
//! name = "outlook"
//! ```

use std::path::{Path, PathBuf};

use calsync_core::TracingOutputFormat;
use calsync_engine::{DEFAULT_WINDOW_DAYS, EngineConfig, default_mapping_path};
use serde::{Deserialize, Serialize};

/// Configuration for the calsync client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Log output format: `pretty`, `compact` or `json`.
    pub log_format: Option<String>,

    /// Reconciliation settings.
    pub sync: SyncSettings,

    /// The calendar mirrored from.
    pub source: CalendarSettings,

    /// The calendar written to.
    pub destination: CalendarSettings,
}

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Half-width of the reconciliation window in days.
    pub window_days: i64,

    /// Where the identifier mapping is stored.
    pub mapping_path: Option<PathBuf>,

    /// Hold a lock file next to the mapping while syncing.
    pub use_lock: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            mapping_path: None,
            use_lock: true,
        }
    }
}

/// One JSON-file calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub path: Option<PathBuf>,

    /// Display name; defaults to the file name.
    pub name: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsync")
    }

    /// Returns the mapping path, configured or default.
    pub fn mapping_path(&self) -> PathBuf {
        self.sync
            .mapping_path
            .clone()
            .unwrap_or_else(default_mapping_path)
    }

    /// Builds the engine configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.mapping_path())
            .with_window_days(self.sync.window_days)
            .with_lock(self.sync.use_lock)
    }

    /// Parses `log_format`, if set.
    pub fn tracing_format(&self) -> Result<Option<TracingOutputFormat>, String> {
        self.log_format
            .as_deref()
            .map(|f| f.parse().map_err(|e| format!("log_format: {}", e)))
            .transpose()
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), String> {
        if self.sync.window_days < 0 {
            return Err(format!(
                "sync.window_days must not be negative, got {}",
                self.sync.window_days
            ));
        }
        self.tracing_format()?;
        if let (Some(source), Some(destination)) = (&self.source.path, &self.destination.path) {
            if source == destination {
                return Err(format!(
                    "source and destination point to the same file: {}",
                    source.display()
                ));
            }
        }
        Ok(())
    }
}
