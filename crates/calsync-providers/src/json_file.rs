//! A calendar stored as a JSON array of raw entries.
//!
//! Each file plays one [`Side`] of a sync. Writes replace the whole file
//! through a temporary sibling and a rename, so readers never observe a
//! half-written calendar.

use std::path::{Path, PathBuf};

use calsync_core::CalendarEntry;
use chrono::{FixedOffset, Local};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::{Side, denormalize_entry, normalize_entries};
use crate::provider::{BoxFuture, CalendarDestination, CalendarSource, FetchResult};
use crate::raw_entry::RawEntry;

/// A JSON file holding one calendar.
#[derive(Debug)]
pub struct JsonFileCalendar {
    name: String,
    path: PathBuf,
    side: Side,
    /// Observer zone for recurrence fields; `None` uses the local zone.
    utc_offset: Option<FixedOffset>,
    write_lock: Mutex<()>,
}

impl JsonFileCalendar {
    /// Creates a calendar backed by `path` for the given side.
    pub fn new(path: impl Into<PathBuf>, side: Side) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path,
            side,
            utc_offset: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Shorthand for the authoritative side.
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Side::Source)
    }

    /// Shorthand for the mirrored side.
    pub fn destination(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Side::Destination)
    }

    /// Builder method to override the calendar name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder method to read recurrence fields at a fixed offset.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Reads the raw entries; a missing file is an empty calendar.
    pub async fn load_raw(&self) -> ProviderResult<Vec<RawEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Calendar file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.tag(e.into())),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| self.tag(e.into()))
    }

    async fn store_raw(&self, entries: &[RawEntry]) -> ProviderResult<()> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| self.tag(e.into()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.tag(e.into()))?;
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.tag(e.into()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.tag(e.into()))?;

        debug!(path = %self.path.display(), count = entries.len(), "Calendar written");
        Ok(())
    }

    fn tag(&self, err: ProviderError) -> ProviderError {
        err.with_provider(&self.name)
    }

    fn not_found(&self, id: &str) -> ProviderError {
        self.tag(ProviderError::not_found(format!("no entry with id {}", id)))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl CalendarSource for JsonFileCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_entries(&self) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        Box::pin(async move {
            let raws = self.load_raw().await?;
            let result = match self.utc_offset {
                Some(offset) => normalize_entries(&raws, self.side, &offset),
                None => normalize_entries(&raws, self.side, &Local),
            };
            info!(
                calendar = %self.name,
                entries = result.entries.len(),
                skipped = result.skipped,
                "Fetched entries"
            );
            Ok(result)
        })
    }
}

impl CalendarDestination for JsonFileCalendar {
    fn create_entry<'a>(
        &'a self,
        entry: &'a CalendarEntry,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut raws = self.load_raw().await?;

            let id = Uuid::new_v4().to_string();
            let mut raw = denormalize_entry(entry, self.side);
            raw.id = Some(id.clone());
            raws.push(raw);

            self.store_raw(&raws).await?;
            debug!(calendar = %self.name, id = %id, subject = %entry.subject, "Created entry");
            Ok(id)
        })
    }

    fn update_entry<'a>(
        &'a self,
        id: &'a str,
        entry: &'a CalendarEntry,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut raws = self.load_raw().await?;

            let slot = raws
                .iter_mut()
                .find(|r| r.id.as_deref() == Some(id))
                .ok_or_else(|| self.not_found(id))?;
            let mut raw = denormalize_entry(entry, self.side);
            raw.id = Some(id.to_string());
            *slot = raw;

            self.store_raw(&raws).await?;
            debug!(calendar = %self.name, id = %id, "Updated entry");
            Ok(())
        })
    }

    fn delete_entry<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut raws = self.load_raw().await?;

            let before = raws.len();
            raws.retain(|r| r.id.as_deref() != Some(id));
            if raws.len() == before {
                return Err(self.not_found(id));
            }

            self.store_raw(&raws).await?;
            debug!(calendar = %self.name, id = %id, "Deleted entry");
            Ok(())
        })
    }
}
