//! Mapping persistence and the run lock.
//!
//! [`MappingStore`] reads and writes the mapping file. While it is alive it
//! holds `<mapping>.lock`, a file containing the owner's PID, so two sync
//! runs never share one mapping. Locks left behind by dead processes are
//! reclaimed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info, warn};

use crate::config::lock_path_for;
use crate::error::{EngineError, EngineResult};
use crate::mapping::IdentifierMapping;

/// Exclusive lock on a mapping file, released on drop.
#[derive(Debug)]
pub struct MappingLock {
    path: PathBuf,
}

impl MappingLock {
    /// Acquires the lock file at `path`.
    ///
    /// Returns [`EngineError::AlreadyRunning`] if a live process holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();

        if path.exists() {
            match read_pid(&path) {
                Some(pid) if is_process_running(pid) => {
                    return Err(EngineError::already_running(path.to_string_lossy()));
                }
                Some(pid) => {
                    warn!(path = %path.display(), pid = pid, "Removing stale mapping lock");
                    fs::remove_file(&path)?;
                }
                None => {
                    warn!(path = %path.display(), "Removing unreadable mapping lock");
                    fs::remove_file(&path)?;
                }
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // create_new closes the race between the check above and the write.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(EngineError::already_running(path.to_string_lossy()));
            }
            Err(e) => return Err(e.into()),
        };
        let pid = process::id();
        writeln!(file, "{}", pid)?;
        file.sync_all()?;

        debug!(path = %path.display(), pid = pid, "Acquired mapping lock");
        Ok(Self { path })
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MappingLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove mapping lock");
            }
        } else {
            debug!(path = %self.path.display(), "Released mapping lock");
        }
    }
}

/// Reads the holder's PID. Zero and values outside `pid_t` count as unreadable,
/// since `kill` treats them as process groups.
fn read_pid(path: &Path) -> Option<u32> {
    let pid: u32 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
    (pid != 0 && i32::try_from(pid).is_ok()).then_some(pid)
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// Reads and writes one mapping file.
#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    lock: Option<MappingLock>,
}

impl MappingStore {
    /// Opens the store, taking `<path>.lock` when `use_lock` is set.
    pub fn open(path: impl Into<PathBuf>, use_lock: bool) -> EngineResult<Self> {
        let path = path.into();
        let lock = if use_lock {
            Some(MappingLock::acquire(lock_path_for(&path))?)
        } else {
            None
        };
        Ok(Self { path, lock })
    }

    /// Returns the mapping file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if this store holds the run lock.
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Loads the mapping; a missing file is an empty mapping.
    pub fn load(&self) -> EngineResult<IdentifierMapping> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Mapping file not found, starting empty");
                return Ok(IdentifierMapping::new());
            }
            Err(source) => {
                return Err(EngineError::MappingLoad {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        let (mapping, malformed) = IdentifierMapping::parse(&text);
        info!(
            path = %self.path.display(),
            pairs = mapping.len(),
            malformed = malformed,
            "Loaded mapping"
        );
        Ok(mapping)
    }

    /// Writes the mapping through a temporary file and a rename.
    pub fn save(&self, mapping: &IdentifierMapping) -> EngineResult<()> {
        let text = mapping.to_text()?;
        self.write_atomic(&text)
            .map_err(|source| EngineError::MappingFlush {
                path: self.path.display().to_string(),
                source,
            })?;
        info!(path = %self.path.display(), pairs = mapping.len(), "Saved mapping");
        Ok(())
    }

    fn write_atomic(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)
    }
}
