//! Recurrence patterns: inference from occurrence lists and foreign mapping.
//!
//! A [`RecurrencePattern`] is a compact description of how an entry repeats.
//! It is built either by [`RecurrencePattern::infer`], which looks at the
//! concrete occurrence timestamps of a series, or by
//! [`RecurrencePattern::from_descriptor`], which trusts the classification a
//! foreign calendar system already made.
//!
//! Inference works on local calendar semantics: day-of-week and day-of-month
//! are taken in the observer's time zone, not in UTC.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PatternError, PatternResult};
use crate::interval::IntervalSequence;
use crate::weekday::WeekdaySet;

/// Fewest occurrences a series can have.
const MIN_OCCURRENCES: u32 = 2;

/// Weekly intervals at or above this are not treated as weekly series.
const MAX_WEEKLY_INTERVAL: i64 = 10;

/// The repeat shape of a pattern.
///
/// Each variant carries exactly the fields that distinguish it; two kinds are
/// equal when their tag, interval, and positional fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceKind {
    /// Every `interval` days.
    Daily { interval: u32 },
    /// Every `interval` weeks on one weekday.
    Weekly { day_of_week: Weekday, interval: u32 },
    /// Every `interval` weeks on several weekdays.
    WeeklyMultiDay { days: WeekdaySet, interval: u32 },
    /// Every `interval` months on a day of the month.
    Monthly { day_of_month: u32, interval: u32 },
    /// Once a year on a fixed day and month.
    Yearly { day_of_month: u32, month_of_year: u32 },
}

impl RecurrenceKind {
    /// Returns the repeat interval in the kind's own unit (1 for yearly).
    pub fn interval(&self) -> u32 {
        match self {
            Self::Daily { interval }
            | Self::Weekly { interval, .. }
            | Self::WeeklyMultiDay { interval, .. }
            | Self::Monthly { interval, .. } => *interval,
            Self::Yearly { .. } => 1,
        }
    }

    /// Returns the descriptor kind name for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily { .. } => KIND_DAILY,
            Self::Weekly { .. } | Self::WeeklyMultiDay { .. } => KIND_WEEKLY,
            Self::Monthly { .. } => KIND_MONTHLY,
            Self::Yearly { .. } => KIND_YEARLY,
        }
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Daily { interval: 1 } => write!(f, "daily"),
            Self::Daily { interval } => write!(f, "every {} days", interval),
            Self::Weekly {
                day_of_week,
                interval: 1,
            } => write!(f, "weekly on {}", day_of_week),
            Self::Weekly {
                day_of_week,
                interval,
            } => write!(f, "every {} weeks on {}", interval, day_of_week),
            Self::WeeklyMultiDay { days, interval: 1 } => write!(f, "weekly on {}", days),
            Self::WeeklyMultiDay { days, interval } => {
                write!(f, "every {} weeks on {}", interval, days)
            }
            Self::Monthly {
                day_of_month,
                interval: 1,
            } => write!(f, "monthly on day {}", day_of_month),
            Self::Monthly {
                day_of_month,
                interval,
            } => write!(f, "every {} months on day {}", interval, day_of_month),
            Self::Yearly {
                day_of_month,
                month_of_year,
            } => write!(f, "yearly on day {} of month {}", day_of_month, month_of_year),
        }
    }
}

/// Descriptor kind for daily series.
pub const KIND_DAILY: &str = "daily";
/// Descriptor kind for weekly series (one or several weekdays).
pub const KIND_WEEKLY: &str = "weekly";
/// Descriptor kind for monthly series.
pub const KIND_MONTHLY: &str = "monthly";
/// Descriptor kind for yearly series.
pub const KIND_YEARLY: &str = "yearly";

/// A recurrence description as handed over by a foreign calendar system.
///
/// Fields that do not apply to `kind` may be left at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDescriptor {
    /// Native kind name (`daily`, `weekly`, `monthly`, `yearly`).
    pub kind: String,
    /// Repeat interval; zero is read as one.
    #[serde(default)]
    pub interval: u32,
    /// Weekday bits for weekly series (bit 0 is Monday).
    #[serde(default)]
    pub day_of_week_mask: u8,
    /// Day of the month for monthly and yearly series.
    #[serde(default)]
    pub day_of_month: u32,
    /// Month of the year for yearly series.
    #[serde(default)]
    pub month_of_year: u32,
    /// First occurrence of the series.
    pub pattern_start: DateTime<Utc>,
    /// Last occurrence of the series.
    pub pattern_end: DateTime<Utc>,
    /// Number of occurrences.
    pub occurrences: u32,
}

/// An immutable description of a repeating series.
///
/// Only [`RecurrencePattern::infer`] and [`RecurrencePattern::from_descriptor`]
/// build patterns, which keeps the interval at least 1 and the occurrence
/// count at least 2. Foreign input goes through [`RecurrenceDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrencePattern {
    kind: RecurrenceKind,
    first_occurrence: DateTime<FixedOffset>,
    last_occurrence: DateTime<FixedOffset>,
    occurrence_count: u32,
}

impl RecurrencePattern {
    /// Infers a pattern from occurrences, reading calendar fields in `tz`.
    ///
    /// The decision order is: constant day gap (daily, then weekly), constant
    /// month gap (yearly, then monthly), then a tiling cycle of day gaps
    /// spanning whole weeks (weekly on several days). A branch whose shape
    /// matches but whose field checks fail hands over to the next one.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidOccurrenceCount`] for fewer than two
    /// occurrences and [`PatternError::NoPatternFound`] when no supported
    /// shape fits.
    pub fn infer<Tz: TimeZone>(occurrences: &[DateTime<Utc>], tz: &Tz) -> PatternResult<Self> {
        if occurrences.len() < 2 {
            return Err(PatternError::InvalidOccurrenceCount {
                count: occurrences.len(),
            });
        }

        let local: Vec<DateTime<Tz>> = occurrences.iter().map(|o| o.with_timezone(tz)).collect();

        let shared = SharedFields::scan(&local);
        if !shared.any() {
            trace!(count = local.len(), "Occurrences share no calendar field");
            return Err(PatternError::NoPatternFound);
        }

        let days = IntervalSequence::days(
            local
                .windows(2)
                .map(|pair| day_delta(&pair[0], &pair[1]))
                .collect(),
        );
        let months = IntervalSequence::months(
            local
                .windows(2)
                .map(|pair| month_delta(&pair[0], &pair[1]))
                .collect(),
        );

        let kind = by_constant_days(&local, &shared, &days)
            .or_else(|| by_constant_months(&local, &shared, &months))
            .or_else(|| by_weekly_cycle(&local, &shared, &days))
            .ok_or(PatternError::NoPatternFound)?;

        trace!(%kind, count = local.len(), "Inferred recurrence");

        let first = &local[0];
        let last = &local[local.len() - 1];
        Ok(Self {
            kind,
            first_occurrence: first.fixed_offset(),
            last_occurrence: last.fixed_offset(),
            occurrence_count: local.len() as u32,
        })
    }

    /// Infers a pattern using the machine's local time zone.
    pub fn infer_local(occurrences: &[DateTime<Utc>]) -> PatternResult<Self> {
        Self::infer(occurrences, &Local)
    }

    /// Translates a foreign descriptor without re-deriving the shape.
    ///
    /// Zero-valued positional fields fall back to the series start, read in
    /// `tz`. Occurrence counts below 2 are raised to 2 and an end before the
    /// start is moved to the start. A weekly descriptor naming one weekday maps to
    /// [`RecurrenceKind::Weekly`], several to [`RecurrenceKind::WeeklyMultiDay`].
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownRecurrenceKind`] for kinds other than
    /// daily, weekly, monthly, and yearly.
    pub fn from_descriptor<Tz: TimeZone>(
        descriptor: &RecurrenceDescriptor,
        tz: &Tz,
    ) -> PatternResult<Self> {
        let start = descriptor.pattern_start.with_timezone(tz);
        let end = descriptor.pattern_end.with_timezone(tz);
        let interval = descriptor.interval.max(1);
        let day_of_month = nonzero_or(descriptor.day_of_month, start.day());

        let kind = match descriptor.kind.to_ascii_lowercase().as_str() {
            KIND_DAILY => RecurrenceKind::Daily { interval },
            KIND_WEEKLY => {
                let mut days = WeekdaySet::from_bits(descriptor.day_of_week_mask);
                if days.is_empty() {
                    days.insert(start.weekday());
                }
                match days.only() {
                    Some(day_of_week) => RecurrenceKind::Weekly {
                        day_of_week,
                        interval,
                    },
                    None => RecurrenceKind::WeeklyMultiDay { days, interval },
                }
            }
            KIND_MONTHLY => RecurrenceKind::Monthly {
                day_of_month,
                interval,
            },
            KIND_YEARLY => RecurrenceKind::Yearly {
                day_of_month,
                month_of_year: nonzero_or(descriptor.month_of_year, start.month()),
            },
            _ => {
                return Err(PatternError::UnknownRecurrenceKind {
                    kind: descriptor.kind.clone(),
                });
            }
        };

        Ok(Self {
            kind,
            first_occurrence: start.fixed_offset(),
            last_occurrence: end.max(start).fixed_offset(),
            occurrence_count: descriptor.occurrences.max(MIN_OCCURRENCES),
        })
    }

    /// Builds the foreign descriptor shape for this pattern.
    pub fn to_descriptor(&self) -> RecurrenceDescriptor {
        let (day_of_week_mask, day_of_month, month_of_year) = match self.kind {
            RecurrenceKind::Daily { .. } => (0, 0, 0),
            RecurrenceKind::Weekly { day_of_week, .. } => {
                (WeekdaySet::single(day_of_week).bits(), 0, 0)
            }
            RecurrenceKind::WeeklyMultiDay { days, .. } => (days.bits(), 0, 0),
            RecurrenceKind::Monthly { day_of_month, .. } => (0, day_of_month, 0),
            RecurrenceKind::Yearly {
                day_of_month,
                month_of_year,
            } => (0, day_of_month, month_of_year),
        };

        RecurrenceDescriptor {
            kind: self.kind.as_str().to_string(),
            interval: self.kind.interval(),
            day_of_week_mask,
            day_of_month,
            month_of_year,
            pattern_start: self.first_occurrence.with_timezone(&Utc),
            pattern_end: self.last_occurrence.with_timezone(&Utc),
            occurrences: self.occurrence_count,
        }
    }

    /// Returns the repeat shape.
    pub fn kind(&self) -> &RecurrenceKind {
        &self.kind
    }

    /// Returns the repeat interval.
    pub fn interval(&self) -> u32 {
        self.kind.interval()
    }

    /// First occurrence, in the observer's offset.
    pub fn first_occurrence(&self) -> DateTime<FixedOffset> {
        self.first_occurrence
    }

    /// Last occurrence, in the observer's offset.
    pub fn last_occurrence(&self) -> DateTime<FixedOffset> {
        self.last_occurrence
    }

    /// Number of occurrences in the series.
    pub fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    /// Returns `true` if both patterns have the same shape.
    ///
    /// Shape is the variant, its interval and positional fields, and the
    /// occurrence count. First and last occurrence are not compared.
    pub fn equivalent_to(&self, other: &Self) -> bool {
        self.kind == other.kind && self.occurrence_count == other.occurrence_count
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} occurrences)", self.kind, self.occurrence_count)
    }
}

/// Calendar fields that held for every adjacent pair of occurrences.
#[derive(Debug, Clone, Copy)]
struct SharedFields {
    minute: bool,
    hour: bool,
    day_of_week: bool,
    day_of_month: bool,
    month: bool,
}

impl SharedFields {
    fn scan<Tz: TimeZone>(local: &[DateTime<Tz>]) -> Self {
        let mut shared = Self {
            minute: true,
            hour: true,
            day_of_week: true,
            day_of_month: true,
            month: true,
        };
        for pair in local.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            shared.minute &= a.minute() == b.minute();
            shared.hour &= a.hour() == b.hour();
            shared.day_of_week &= a.weekday() == b.weekday();
            shared.day_of_month &= a.day() == b.day();
            shared.month &= a.month() == b.month();
        }
        shared
    }

    fn any(&self) -> bool {
        self.minute || self.hour || self.day_of_week || self.day_of_month || self.month
    }

    fn same_time_of_day(&self) -> bool {
        self.hour && self.minute
    }
}

fn by_constant_days<Tz: TimeZone>(
    local: &[DateTime<Tz>],
    shared: &SharedFields,
    days: &IntervalSequence,
) -> Option<RecurrenceKind> {
    let d = days.constant_value()?;
    if d < 7 {
        return (d >= 1 && shared.same_time_of_day()).then_some(RecurrenceKind::Daily {
            interval: d as u32,
        });
    }

    let weeks = d / 7;
    (shared.day_of_week && weeks < MAX_WEEKLY_INTERVAL).then(|| RecurrenceKind::Weekly {
        day_of_week: local[0].weekday(),
        interval: weeks as u32,
    })
}

fn by_constant_months<Tz: TimeZone>(
    local: &[DateTime<Tz>],
    shared: &SharedFields,
    months: &IntervalSequence,
) -> Option<RecurrenceKind> {
    let m = months.constant_value()?;
    let first = &local[0];
    if m == 12 {
        (shared.month && shared.day_of_month).then(|| RecurrenceKind::Yearly {
            day_of_month: first.day(),
            month_of_year: first.month(),
        })
    } else if (1..12).contains(&m) && shared.day_of_month {
        Some(RecurrenceKind::Monthly {
            day_of_month: first.day(),
            interval: m as u32,
        })
    } else {
        None
    }
}

fn by_weekly_cycle<Tz: TimeZone>(
    local: &[DateTime<Tz>],
    shared: &SharedFields,
    days: &IntervalSequence,
) -> Option<RecurrenceKind> {
    let cycle = days.repeating_cycle()?;
    let span: i64 = cycle.iter().sum();
    if span % 7 != 0 {
        return None;
    }

    let weeks = span / 7;
    if !shared.same_time_of_day() || weeks >= MAX_WEEKLY_INTERVAL {
        return None;
    }

    weekday_mask(local).map(|days| RecurrenceKind::WeeklyMultiDay {
        days,
        interval: weeks as u32,
    })
}

/// Collects the weekdays of the first week and checks every occurrence
/// follows them in order.
fn weekday_mask<Tz: TimeZone>(local: &[DateTime<Tz>]) -> Option<WeekdaySet> {
    let mut first_week: Vec<Weekday> = Vec::new();
    for occurrence in local {
        let day = occurrence.weekday();
        if first_week.contains(&day) {
            break;
        }
        first_week.push(day);
    }

    if first_week.is_empty() {
        return None;
    }

    let consistent = local
        .iter()
        .enumerate()
        .all(|(i, o)| o.weekday() == first_week[i % first_week.len()]);

    consistent.then(|| first_week.into_iter().collect())
}

/// Whole days between two local instants, rounded.
fn day_delta<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> i64 {
    let seconds = (b.naive_local() - a.naive_local()).num_seconds();
    (seconds as f64 / 86_400.0).round() as i64
}

/// Calendar months between two local instants.
fn month_delta<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> i64 {
    i64::from(b.year() - a.year()) * 12 + (i64::from(b.month()) - i64::from(a.month()))
}

fn nonzero_or(value: u32, fallback: u32) -> u32 {
    if value == 0 { fallback } else { value }
}
