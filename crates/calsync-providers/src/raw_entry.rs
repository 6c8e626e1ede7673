//! Raw entry shape exchanged with calendar backends.
//!
//! [`RawEntry`] is what a backend stores or receives before normalization.
//! Its optional fields mirror what foreign calendars typically leave empty,
//! and its recurrence is either a foreign descriptor or a plain list of
//! occurrences.

use calsync_core::RecurrenceDescriptor;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A start or end as stored by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEntryTime {
    /// A specific instant.
    DateTime(DateTime<Utc>),
    /// A whole day (all-day entries).
    Date(NaiveDate),
}

impl RawEntryTime {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the instant, reading dates as midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

/// Repeat information as stored by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawRecurrence {
    /// The backend's own classification.
    Descriptor(RecurrenceDescriptor),
    /// Every occurrence of the series, oldest first.
    Occurrences(Vec<DateTime<Utc>>),
}

/// A calendar entry before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Backend identifier; absent for entries not yet stored.
    #[serde(default)]
    pub id: Option<String>,
    pub start: RawEntryTime,
    pub end: RawEntryTime,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time_zone: Option<String>,
    #[serde(default)]
    pub end_time_zone: Option<String>,
    #[serde(default)]
    pub required_attendees: Vec<String>,
    #[serde(default)]
    pub optional_attendees: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub recurrence: Option<RawRecurrence>,
}

impl RawEntry {
    /// Creates a raw entry with the minimum required fields.
    pub fn new(start: RawEntryTime, end: RawEntryTime) -> Self {
        Self {
            id: None,
            start,
            end,
            subject: None,
            body: None,
            location: None,
            start_time_zone: None,
            end_time_zone: None,
            required_attendees: Vec::new(),
            optional_attendees: Vec::new(),
            categories: Vec::new(),
            recurrence: None,
        }
    }

    /// Returns the subject, falling back to "(No subject)" if empty.
    pub fn effective_subject(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(No subject)")
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_recurrence(mut self, recurrence: RawRecurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datetime() -> DateTime<Utc> {
        "2025-02-05T10:00:00Z".parse().unwrap()
    }

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
    }

    #[test]
    fn time_variants() {
        let dt = RawEntryTime::from_datetime(sample_datetime());
        assert!(!dt.is_all_day());
        assert_eq!(dt.to_utc(), sample_datetime());

        let date = RawEntryTime::from_date(sample_date());
        assert!(date.is_all_day());
        assert_eq!(date.to_utc(), "2025-02-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn creation_and_builder() {
        let start = RawEntryTime::from_datetime(sample_datetime());
        let entry = RawEntry::new(start.clone(), start);
        assert_eq!(entry.effective_subject(), "(No subject)");
        assert!(entry.id.is_none());

        let entry = entry
            .with_id("e1")
            .with_subject("Budget")
            .with_body("Q3 numbers")
            .with_location("Room 2");
        assert_eq!(entry.effective_subject(), "Budget");
        assert_eq!(entry.id.as_deref(), Some("e1"));
        assert_eq!(entry.location.as_deref(), Some("Room 2"));
    }

    #[test]
    fn blank_subject_falls_back() {
        let start = RawEntryTime::from_date(sample_date());
        let entry = RawEntry::new(start.clone(), start).with_subject("   ");
        assert_eq!(entry.effective_subject(), "(No subject)");
        assert!(entry.is_all_day());
    }

    #[test]
    fn parses_minimal_json() {
        let json = r#"{
            "start": {"type": "DateTime", "value": "2025-02-05T10:00:00Z"},
            "end": {"type": "DateTime", "value": "2025-02-05T11:00:00Z"},
            "subject": "Standup",
            "recurrence": {"type": "occurrences", "value": ["2025-02-05T10:00:00Z"]}
        }"#;
        let entry: RawEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.subject.as_deref(), Some("Standup"));
        assert!(entry.categories.is_empty());
        assert_eq!(
            entry.recurrence,
            Some(RawRecurrence::Occurrences(vec![sample_datetime()]))
        );
    }

    #[test]
    fn serde_roundtrip() {
        let start = RawEntryTime::from_datetime(sample_datetime());
        let entry = RawEntry::new(start.clone(), start)
            .with_id("e1")
            .with_subject("Test Entry");

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: RawEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, parsed);
    }
}
