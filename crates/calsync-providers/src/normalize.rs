//! RawEntry to CalendarEntry conversion pipeline.
//!
//! The normalization process:
//! 1. Converts raw start/end to UTC instants (dates read as midnight UTC)
//! 2. Maps the backend identifier onto the id slot of the given [`Side`]
//! 3. Translates recurrence: descriptors map directly, occurrence lists go
//!    through inference and fall back to the raw list when no pattern fits
//!
//! [`denormalize_entry`] is the inverse used by writers.

use calsync_core::{CalendarEntry, PatternError, RecurrencePattern};
use chrono::TimeZone;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::FetchResult;
use crate::raw_entry::{RawEntry, RawEntryTime, RawRecurrence};

/// Which side of a sync a calendar plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The authoritative calendar; ids land in `source_id`.
    Source,
    /// The mirrored calendar; ids land in `destination_id`.
    Destination,
}

impl Side {
    /// Returns the id this side owns on `entry`.
    pub fn id_of<'a>(&self, entry: &'a CalendarEntry) -> Option<&'a str> {
        match self {
            Self::Source => entry.source_id.as_deref(),
            Self::Destination => entry.destination_id.as_deref(),
        }
    }

    /// Stores `id` in the slot this side owns.
    pub fn assign_id(&self, entry: &mut CalendarEntry, id: Option<String>) {
        match self {
            Self::Source => entry.source_id = id,
            Self::Destination => entry.destination_id = id,
        }
    }
}

/// Converts a [`RawEntry`] to a [`CalendarEntry`].
///
/// Calendar fields of recurrences are read in `tz`.
///
/// # Errors
///
/// Returns an `InvalidData` error if the entry ends before it starts, and an
/// `Unsupported` error for recurrence kinds that cannot be expressed.
pub fn normalize_entry<Tz: TimeZone>(
    raw: &RawEntry,
    side: Side,
    tz: &Tz,
) -> ProviderResult<CalendarEntry> {
    let start = raw.start.to_utc();
    let end = raw.end.to_utc();

    let mut entry = CalendarEntry::new(raw.effective_subject(), start, end)
        .map_err(|e| ProviderError::invalid_data(e.to_string()).with_source(e))?
        .with_all_day(raw.is_all_day())
        .with_time_zones(raw.start_time_zone.clone(), raw.end_time_zone.clone())
        .with_attendees(
            raw.required_attendees.clone(),
            raw.optional_attendees.clone(),
        )
        .with_categories(raw.categories.clone());

    if let Some(ref body) = raw.body {
        entry = entry.with_body(body);
    }
    if let Some(ref location) = raw.location {
        entry = entry.with_location(location);
    }

    side.assign_id(&mut entry, raw.id.clone());

    match raw.recurrence {
        Some(RawRecurrence::Descriptor(ref descriptor)) => {
            let pattern = RecurrencePattern::from_descriptor(descriptor, tz)
                .map_err(|e| ProviderError::unsupported(e.to_string()).with_source(e))?;
            entry = entry.with_recurrence(pattern);
        }
        Some(RawRecurrence::Occurrences(ref occurrences)) => {
            entry = attach_occurrences(entry, occurrences, tz)?;
        }
        None => {}
    }

    Ok(entry)
}

fn attach_occurrences<Tz: TimeZone>(
    entry: CalendarEntry,
    occurrences: &[chrono::DateTime<chrono::Utc>],
    tz: &Tz,
) -> ProviderResult<CalendarEntry> {
    let mut sorted = occurrences.to_vec();
    sorted.sort();
    sorted.dedup();

    match RecurrencePattern::infer(&sorted, tz) {
        Ok(pattern) => Ok(entry.with_recurrence(pattern)),
        Err(PatternError::NoPatternFound) => {
            debug!(
                subject = %entry.subject,
                count = sorted.len(),
                "No recurrence pattern fits, keeping raw occurrences"
            );
            Ok(entry.with_occurrences(sorted))
        }
        // A lone occurrence is a single entry.
        Err(PatternError::InvalidOccurrenceCount { .. }) => Ok(entry),
        Err(e) => Err(ProviderError::invalid_data(e.to_string()).with_source(e)),
    }
}

/// Normalizes a batch, counting entries that fail instead of aborting.
pub fn normalize_entries<Tz: TimeZone>(raws: &[RawEntry], side: Side, tz: &Tz) -> FetchResult {
    let mut entries = Vec::with_capacity(raws.len());
    let mut skipped = 0;

    for raw in raws {
        match normalize_entry(raw, side, tz) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(
                    id = raw.id.as_deref().unwrap_or("-"),
                    subject = raw.effective_subject(),
                    error = %e,
                    "Skipping entry"
                );
                skipped += 1;
            }
        }
    }

    FetchResult::with_entries(entries).with_skipped(skipped)
}

/// Converts a [`CalendarEntry`] back to the raw shape stored by backends.
///
/// The id is taken from the slot `side` owns. Patterns become descriptors;
/// explicit occurrence lists are kept as they are.
pub fn denormalize_entry(entry: &CalendarEntry, side: Side) -> RawEntry {
    let (start, end) = if entry.all_day {
        (
            RawEntryTime::from_date(entry.start().date_naive()),
            RawEntryTime::from_date(entry.end().date_naive()),
        )
    } else {
        (
            RawEntryTime::from_datetime(entry.start()),
            RawEntryTime::from_datetime(entry.end()),
        )
    };

    let recurrence = match (&entry.recurrence, entry.occurrences.is_empty()) {
        (Some(pattern), _) => Some(RawRecurrence::Descriptor(pattern.to_descriptor())),
        (None, false) => Some(RawRecurrence::Occurrences(entry.occurrences.clone())),
        (None, true) => None,
    };

    RawEntry {
        id: side.id_of(entry).map(str::to_string),
        start,
        end,
        subject: Some(entry.subject.clone()),
        body: non_empty(&entry.body),
        location: non_empty(&entry.location),
        start_time_zone: entry.start_time_zone.clone(),
        end_time_zone: entry.end_time_zone.clone(),
        required_attendees: entry.required_attendees.clone(),
        optional_attendees: entry.optional_attendees.clone(),
        categories: entry.categories.clone(),
        recurrence,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
