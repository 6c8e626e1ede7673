//! Engine configuration.

use std::path::PathBuf;

/// Default half-width of the reconciliation window, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Source entries starting within this many days of now are reconciled.
    pub window_days: i64,

    /// Where the identifier mapping is persisted.
    pub mapping_path: PathBuf,

    /// Whether to hold `<mapping>.lock` for the lifetime of the engine.
    pub use_lock: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            mapping_path: default_mapping_path(),
            use_lock: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration persisting the mapping at `mapping_path`.
    pub fn new(mapping_path: impl Into<PathBuf>) -> Self {
        Self {
            mapping_path: mapping_path.into(),
            ..Default::default()
        }
    }

    /// Builder: set the window half-width.
    #[must_use]
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    /// Builder: enable or disable the lock file.
    #[must_use]
    pub fn with_lock(mut self, use_lock: bool) -> Self {
        self.use_lock = use_lock;
        self
    }

    /// Path of the lock file guarding the mapping.
    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.mapping_path)
    }
}

/// Returns `<path>.lock`.
pub(crate) fn lock_path_for(path: &std::path::Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Returns the default mapping path.
///
/// Uses `<data_dir>/calsync/mapping.txt`, falling back to the current
/// directory when no data directory is known.
pub fn default_mapping_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("calsync"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapping.txt")
}
