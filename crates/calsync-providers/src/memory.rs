//! An in-memory calendar.
//!
//! Useful for tests and dry runs: entries live in a vector and ids are
//! handed out from a counter (`<prefix>1`, `<prefix>2`, ...).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use calsync_core::CalendarEntry;
use tokio::sync::Mutex;

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::Side;
use crate::provider::{BoxFuture, CalendarDestination, CalendarSource, FetchResult};

/// A calendar held entirely in memory.
#[derive(Debug)]
pub struct MemoryCalendar {
    name: String,
    side: Side,
    id_prefix: String,
    next_id: AtomicU64,
    entries: Mutex<Vec<CalendarEntry>>,
    /// Subjects whose writes are rejected.
    rejected: HashSet<String>,
}

impl MemoryCalendar {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side,
            id_prefix: "m".to_string(),
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
            rejected: HashSet::new(),
        }
    }

    /// Builder method to seed entries.
    #[must_use]
    pub fn with_entries(self, entries: Vec<CalendarEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..self
        }
    }

    /// Builder method to set the prefix of generated ids.
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Builder method to make writes of entries with `subject` fail.
    #[must_use]
    pub fn rejecting(mut self, subject: impl Into<String>) -> Self {
        self.rejected.insert(subject.into());
        self
    }

    /// Returns a copy of the stored entries.
    pub async fn snapshot(&self) -> Vec<CalendarEntry> {
        self.entries.lock().await.clone()
    }

    fn check_writable(&self, entry: &CalendarEntry) -> ProviderResult<()> {
        if self.rejected.contains(&entry.subject) {
            return Err(ProviderError::unsupported(format!(
                "entry '{}' was rejected",
                entry.subject
            ))
            .with_provider(&self.name));
        }
        Ok(())
    }

    fn stored(&self, entry: &CalendarEntry, id: &str) -> CalendarEntry {
        let mut stored = entry.clone();
        stored.source_id = None;
        stored.destination_id = None;
        self.side.assign_id(&mut stored, Some(id.to_string()));
        stored
    }
}

impl CalendarSource for MemoryCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_entries(&self) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        Box::pin(async move { Ok(FetchResult::with_entries(self.snapshot().await)) })
    }
}

impl CalendarDestination for MemoryCalendar {
    fn create_entry<'a>(
        &'a self,
        entry: &'a CalendarEntry,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.check_writable(entry)?;
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            let id = format!("{}{}", self.id_prefix, n);
            let stored = self.stored(entry, &id);
            self.entries.lock().await.push(stored);
            Ok(id)
        })
    }

    fn update_entry<'a>(
        &'a self,
        id: &'a str,
        entry: &'a CalendarEntry,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.check_writable(entry)?;
            let mut entries = self.entries.lock().await;
            let slot = entries
                .iter_mut()
                .find(|e| self.side.id_of(e) == Some(id))
                .ok_or_else(|| {
                    ProviderError::not_found(format!("no entry with id {}", id))
                        .with_provider(&self.name)
                })?;
            *slot = self.stored(entry, id);
            Ok(())
        })
    }

    fn delete_entry<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let before = entries.len();
            entries.retain(|e| self.side.id_of(e) != Some(id));
            if entries.len() == before {
                return Err(ProviderError::not_found(format!("no entry with id {}", id))
                    .with_provider(&self.name));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{DateTime, Utc};

    fn entry(subject: &str) -> CalendarEntry {
        let start: DateTime<Utc> = "2025-02-05T10:00:00Z".parse().unwrap();
        CalendarEntry::new(subject, start, start).unwrap()
    }

    #[tokio::test]
    async fn ids_follow_prefix() {
        let cal = MemoryCalendar::new("outlook", Side::Destination).with_id_prefix("o");
        let first = cal.create_entry(&entry("a").with_source_id("n1")).await.unwrap();
        let second = cal.create_entry(&entry("b")).await.unwrap();
        assert_eq!(first, "o1");
        assert_eq!(second, "o2");

        let stored = cal.snapshot().await;
        assert_eq!(stored[0].destination_id.as_deref(), Some("o1"));
        // The source id is not carried into the destination.
        assert!(stored[0].source_id.is_none());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let cal = MemoryCalendar::new("outlook", Side::Destination)
            .with_entries(vec![entry("a").with_destination_id("o9")]);

        cal.update_entry("o9", &entry("a2")).await.unwrap();
        assert_eq!(cal.snapshot().await[0].subject, "a2");

        cal.delete_entry("o9").await.unwrap();
        let err = cal.delete_entry("o9").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert!(cal.fetch_entries().await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn rejected_subjects_fail() {
        let cal = MemoryCalendar::new("outlook", Side::Destination).rejecting("secret");
        let err = cal.create_entry(&entry("secret")).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Unsupported);
        assert!(cal.snapshot().await.is_empty());
    }
}
