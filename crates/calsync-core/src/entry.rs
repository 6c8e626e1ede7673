//! Calendar entries shared by both sides of a sync.
//!
//! A [`CalendarEntry`] is the normalized shape every calendar adapter hands
//! to the engine. It carries one optional identifier per external system
//! and either a [`RecurrencePattern`], an explicit occurrence list, or
//! nothing for single entries.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::recurrence::RecurrencePattern;

/// Field name reported when subjects differ.
pub const FIELD_SUBJECT: &str = "Subject";
/// Field name reported when bodies differ.
pub const FIELD_BODY: &str = "Body";
/// Field name reported when the all-day flags differ.
pub const FIELD_ALL_DAY: &str = "All Day";
/// Field name reported when start times differ.
pub const FIELD_START: &str = "Start";
/// Field name reported when end times differ.
pub const FIELD_END: &str = "End";
/// Field name reported when locations differ.
pub const FIELD_LOCATION: &str = "Location";
/// Field name reported when recurrence differs.
pub const FIELD_RECURRENCE: &str = "Recurrence";

/// A normalized calendar entry.
///
/// Start and end are stored in UTC with `start <= end`. Entries are only
/// built through [`CalendarEntry::new`] and the setters, so they serialize
/// but do not deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    /// The entry title.
    pub subject: String,
    /// Free-form description.
    pub body: String,
    /// Where the entry takes place.
    pub location: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    /// Time zone the source system attached to the start, if any.
    pub start_time_zone: Option<String>,
    /// Time zone the source system attached to the end, if any.
    pub end_time_zone: Option<String>,
    /// Whether the entry spans whole days.
    pub all_day: bool,
    /// Names of required participants.
    pub required_attendees: Vec<String>,
    /// Names of optional participants.
    pub optional_attendees: Vec<String>,
    /// Category tags.
    pub categories: Vec<String>,
    /// Identifier in the source (authoritative) system.
    pub source_id: Option<String>,
    /// Identifier in the destination system.
    pub destination_id: Option<String>,
    /// Repeat description, when the series reduces to one.
    pub recurrence: Option<RecurrencePattern>,
    /// Explicit occurrences of a series that has no pattern.
    pub occurrences: Vec<DateTime<Utc>>,
}

impl CalendarEntry {
    /// Creates a single-occurrence entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeRange`] if `start` is after `end`.
    pub fn new(
        subject: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Self> {
        check_range(start, end)?;
        Ok(Self {
            subject: subject.into(),
            body: String::new(),
            location: String::new(),
            start,
            end,
            start_time_zone: None,
            end_time_zone: None,
            all_day: false,
            required_attendees: Vec::new(),
            optional_attendees: Vec::new(),
            categories: Vec::new(),
            source_id: None,
            destination_id: None,
            recurrence: None,
            occurrences: Vec::new(),
        })
    }

    /// Start instant in UTC.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End instant in UTC.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` for repeating entries, with or without a pattern.
    pub fn is_repeating(&self) -> bool {
        self.recurrence.is_some() || self.occurrences.len() > 1
    }

    /// Builder method to set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set the all-day flag.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Builder method to set the per-side time zones.
    pub fn with_time_zones(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start_time_zone = start;
        self.end_time_zone = end;
        self
    }

    /// Builder method to set participants.
    pub fn with_attendees(mut self, required: Vec<String>, optional: Vec<String>) -> Self {
        self.required_attendees = required;
        self.optional_attendees = optional;
        self
    }

    /// Builder method to set category tags.
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Builder method to set the source identifier.
    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// Builder method to set the destination identifier.
    pub fn with_destination_id(mut self, id: impl Into<String>) -> Self {
        self.destination_id = Some(id.into());
        self
    }

    /// Builder method to set the recurrence pattern.
    pub fn with_recurrence(mut self, pattern: RecurrencePattern) -> Self {
        self.recurrence = Some(pattern);
        self
    }

    /// Builder method to keep an explicit occurrence list.
    pub fn with_occurrences(mut self, occurrences: Vec<DateTime<Utc>>) -> Self {
        self.occurrences = occurrences;
        self
    }

    /// Moves the start to another date, keeping its time of day.
    pub fn set_start_date(&mut self, date: NaiveDate) -> CoreResult<()> {
        let start = date.and_time(self.start.time()).and_utc();
        self.set_range(start, self.end)
    }

    /// Moves the start to another time of day, keeping its date.
    pub fn set_start_time(&mut self, time: NaiveTime) -> CoreResult<()> {
        let start = self.start.date_naive().and_time(time).and_utc();
        self.set_range(start, self.end)
    }

    /// Moves the end to another date, keeping its time of day.
    pub fn set_end_date(&mut self, date: NaiveDate) -> CoreResult<()> {
        let end = date.and_time(self.end.time()).and_utc();
        self.set_range(self.start, end)
    }

    /// Moves the end to another time of day, keeping its date.
    pub fn set_end_time(&mut self, time: NaiveTime) -> CoreResult<()> {
        let end = self.end.date_naive().and_time(time).and_utc();
        self.set_range(self.start, end)
    }

    fn set_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
        check_range(start, end)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Lists the fields that differ from `other`, in a fixed order.
    ///
    /// Start and end compare by date only when either entry is all-day.
    /// Recurrence compares pattern shape when both sides repeat, and counts
    /// as different when only one side does.
    pub fn differences(&self, other: &CalendarEntry) -> Vec<&'static str> {
        let mut fields = Vec::new();

        if self.subject != other.subject {
            fields.push(FIELD_SUBJECT);
        }
        if self.body != other.body {
            fields.push(FIELD_BODY);
        }
        if self.all_day != other.all_day {
            fields.push(FIELD_ALL_DAY);
        }

        let date_only = self.all_day || other.all_day;
        if !same_instant(self.start, other.start, date_only) {
            fields.push(FIELD_START);
        }
        if !same_instant(self.end, other.end, date_only) {
            fields.push(FIELD_END);
        }

        if self.location != other.location {
            fields.push(FIELD_LOCATION);
        }

        let same_recurrence = match (&self.recurrence, &other.recurrence) {
            (Some(a), Some(b)) => a.equivalent_to(b),
            (None, None) => self.occurrences == other.occurrences,
            _ => false,
        };
        if !same_recurrence {
            fields.push(FIELD_RECURRENCE);
        }

        fields
    }

    /// Returns `true` when [`differences`](Self::differences) is empty.
    pub fn equivalent_to(&self, other: &CalendarEntry) -> bool {
        self.differences(other).is_empty()
    }
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
    if start > end {
        return Err(CoreError::invalid_time_range(start, end));
    }
    Ok(())
}

fn same_instant(a: DateTime<Utc>, b: DateTime<Utc>, date_only: bool) -> bool {
    if date_only {
        a.date_naive() == b.date_naive()
    } else {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurrencePattern;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn sample_entry() -> CalendarEntry {
        CalendarEntry::new(
            "Design review",
            utc(2025, 2, 5, 10, 0),
            utc(2025, 2, 5, 11, 0),
        )
        .unwrap()
        .with_body("Agenda attached")
        .with_location("Room 4")
    }

    fn weekly(start: DateTime<Utc>, count: i32) -> RecurrencePattern {
        let occurrences: Vec<_> = (0..count).map(|i| start + Duration::weeks(1) * i).collect();
        RecurrencePattern::infer(&occurrences, &Utc).unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn rejects_inverted_range() {
            let result = CalendarEntry::new("x", utc(2025, 2, 5, 11, 0), utc(2025, 2, 5, 10, 0));
            assert!(matches!(result, Err(CoreError::InvalidTimeRange { .. })));
        }

        #[test]
        fn zero_length_is_allowed() {
            let at = utc(2025, 2, 5, 10, 0);
            let entry = CalendarEntry::new("Reminder", at, at).unwrap();
            assert_eq!(entry.start(), entry.end());
            assert!(!entry.is_repeating());
        }

        #[test]
        fn builder_pattern() {
            let entry = sample_entry()
                .with_all_day(true)
                .with_time_zones(Some("Europe/Paris".to_string()), None)
                .with_attendees(vec!["Ana".to_string()], vec!["Bo".to_string()])
                .with_categories(vec!["Work".to_string()])
                .with_source_id("n1")
                .with_destination_id("o1");

            assert!(entry.all_day);
            assert_eq!(entry.start_time_zone.as_deref(), Some("Europe/Paris"));
            assert_eq!(entry.required_attendees, vec!["Ana"]);
            assert_eq!(entry.optional_attendees, vec!["Bo"]);
            assert_eq!(entry.categories, vec!["Work"]);
            assert_eq!(entry.source_id.as_deref(), Some("n1"));
            assert_eq!(entry.destination_id.as_deref(), Some("o1"));
        }

        #[test]
        fn repeating_detection() {
            let start = utc(2025, 2, 5, 10, 0);
            assert!(sample_entry().with_recurrence(weekly(start, 3)).is_repeating());
            assert!(
                sample_entry()
                    .with_occurrences(vec![start, start + Duration::days(1)])
                    .is_repeating()
            );
            assert!(!sample_entry().with_occurrences(vec![start]).is_repeating());
        }
    }

    mod update_helpers {
        use super::*;

        #[test]
        fn start_date_keeps_time_of_day() {
            let mut entry = sample_entry();
            entry
                .set_end_date(NaiveDate::from_ymd_opt(2025, 2, 7).unwrap())
                .unwrap();
            entry
                .set_start_date(NaiveDate::from_ymd_opt(2025, 2, 6).unwrap())
                .unwrap();
            assert_eq!(entry.start(), utc(2025, 2, 6, 10, 0));
            assert_eq!(entry.end(), utc(2025, 2, 7, 11, 0));
        }

        #[test]
        fn time_keeps_date() {
            let mut entry = sample_entry();
            entry
                .set_end_time(NaiveTime::from_hms_opt(15, 30, 0).unwrap())
                .unwrap();
            entry
                .set_start_time(NaiveTime::from_hms_opt(14, 0, 0).unwrap())
                .unwrap();
            assert_eq!(entry.start(), utc(2025, 2, 5, 14, 0));
            assert_eq!(entry.end(), utc(2025, 2, 5, 15, 30));
        }

        #[test]
        fn rejects_start_after_end() {
            let mut entry = sample_entry();
            let result = entry.set_start_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
            assert!(result.is_err());
            // Unchanged on failure.
            assert_eq!(entry.start(), utc(2025, 2, 5, 10, 0));
        }
    }

    mod diff {
        use super::*;

        #[test]
        fn identical_entries() {
            let a = sample_entry();
            assert!(a.differences(&a.clone()).is_empty());
            assert!(a.equivalent_to(&a.clone()));
        }

        #[test]
        fn ids_and_attendees_are_not_compared() {
            let a = sample_entry().with_source_id("n1");
            let b = sample_entry()
                .with_destination_id("o1")
                .with_attendees(vec!["Ana".to_string()], vec![])
                .with_categories(vec!["Work".to_string()]);
            assert!(a.equivalent_to(&b));
        }

        #[test]
        fn reports_fields_in_order() {
            let a = sample_entry();
            let mut b = sample_entry()
                .with_location("Room 5")
                .with_body("New agenda");
            b.subject = "Design review (moved)".to_string();
            b.set_end_time(NaiveTime::from_hms_opt(11, 30, 0).unwrap())
                .unwrap();

            assert_eq!(
                a.differences(&b),
                vec![FIELD_SUBJECT, FIELD_BODY, FIELD_END, FIELD_LOCATION]
            );
            assert!(!a.equivalent_to(&b));
        }

        #[test]
        fn all_day_compares_dates_only() {
            let a = CalendarEntry::new("Off", utc(2025, 2, 5, 0, 0), utc(2025, 2, 6, 0, 0))
                .unwrap()
                .with_all_day(true);
            let b = CalendarEntry::new("Off", utc(2025, 2, 5, 8, 0), utc(2025, 2, 6, 8, 0))
                .unwrap()
                .with_all_day(true);
            assert!(a.equivalent_to(&b));

            // Only one side all-day still compares by date, but flags differ.
            let c = b.clone().with_all_day(false);
            assert_eq!(a.differences(&c), vec![FIELD_ALL_DAY]);
        }

        #[test]
        fn recurrence_shape() {
            let start = utc(2025, 2, 5, 10, 0);
            let a = sample_entry().with_recurrence(weekly(start, 4));
            let same_shape = sample_entry().with_recurrence(weekly(start + Duration::weeks(1), 4));
            let longer = sample_entry().with_recurrence(weekly(start, 5));

            assert!(a.equivalent_to(&same_shape));
            assert_eq!(a.differences(&longer), vec![FIELD_RECURRENCE]);
            assert_eq!(a.differences(&sample_entry()), vec![FIELD_RECURRENCE]);
        }
    }

    #[test]
    fn serializes_times_and_ids() {
        let entry = sample_entry()
            .with_source_id("n1")
            .with_recurrence(weekly(utc(2025, 2, 5, 10, 0), 3));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["start"], serde_json::json!(entry.start()));
        assert_eq!(json["end"], serde_json::json!(entry.end()));
        assert_eq!(json["source_id"], "n1");
        assert_eq!(json["destination_id"], serde_json::Value::Null);
        assert_eq!(json["recurrence"]["occurrence_count"], 3);
    }
}
