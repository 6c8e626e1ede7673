//! Source and destination traits.
//!
//! A [`CalendarSource`] hands normalized entries to the engine. A
//! [`CalendarDestination`] additionally accepts the writes the engine plans.
//! Both traits are object-safe so the engine can hold `&dyn` references.

use std::future::Future;
use std::pin::Pin;

use calsync_core::CalendarEntry;

use crate::error::ProviderResult;

/// Entries read from a calendar.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Entries that normalized cleanly.
    pub entries: Vec<CalendarEntry>,
    /// Number of raw entries that were dropped during normalization.
    pub skipped: usize,
}

impl FetchResult {
    /// Creates a fetch result with no skipped entries.
    pub fn with_entries(entries: Vec<CalendarEntry>) -> Self {
        Self {
            entries,
            skipped: 0,
        }
    }

    /// Builder method to set the skipped count.
    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxing keeps the traits usable as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar the engine can read from.
pub trait CalendarSource: Send + Sync {
    /// Returns a short name for logs and errors.
    fn name(&self) -> &str;

    /// Reads every entry of the calendar.
    ///
    /// Entries that cannot be normalized are counted in
    /// [`FetchResult::skipped`] instead of failing the whole fetch.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the backing store cannot be read.
    fn fetch_entries(&self) -> BoxFuture<'_, ProviderResult<FetchResult>>;
}

/// A calendar the engine can write planned changes to.
pub trait CalendarDestination: CalendarSource {
    /// Creates an entry and returns its fresh identifier.
    fn create_entry<'a>(&'a self, entry: &'a CalendarEntry) -> BoxFuture<'a, ProviderResult<String>>;

    /// Replaces the entry stored under `id`.
    fn update_entry<'a>(
        &'a self,
        id: &'a str,
        entry: &'a CalendarEntry,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes the entry stored under `id`.
    fn delete_entry<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;
}
