//! Time windows for selecting entries to reconcile.
//!
//! A [`TimeWindow`] is a closed interval `[start, end]` in UTC. The usual
//! way to build one is [`TimeWindow::around`], which centres the window on
//! the current instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A closed time window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new window.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeRange`] if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::invalid_time_range(start, end));
        }
        Ok(Self { start, end })
    }

    /// Creates the window `[now - days, now + days]`.
    ///
    /// Negative spans are clamped to zero. Bounds saturate at the
    /// representable range instead of overflowing.
    pub fn around(now: DateTime<Utc>, days: i64) -> Self {
        let Some(span) = Duration::try_days(days.max(0)) else {
            return Self {
                start: DateTime::<Utc>::MIN_UTC,
                end: DateTime::<Utc>::MAX_UTC,
            };
        };
        Self {
            start: now
                .checked_sub_signed(span)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now
                .checked_add_signed(span)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns the length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if an instant falls within the window, bounds included.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn creation() {
        let window = TimeWindow::new(utc(2025, 2, 5, 0, 0), utc(2025, 2, 6, 0, 0)).unwrap();
        assert_eq!(window.duration(), Duration::days(1));
    }

    #[test]
    fn invalid_window() {
        let result = TimeWindow::new(utc(2025, 2, 6, 0, 0), utc(2025, 2, 5, 0, 0));
        assert!(matches!(result, Err(CoreError::InvalidTimeRange { .. })));
    }

    #[test]
    fn around_now() {
        let now = utc(2025, 2, 15, 12, 0);
        let window = TimeWindow::around(now, 30);
        assert_eq!(window.start, utc(2025, 1, 16, 12, 0));
        assert_eq!(window.end, utc(2025, 3, 17, 12, 0));

        let empty = TimeWindow::around(now, -3);
        assert_eq!(empty.start, now);
        assert_eq!(empty.end, now);
    }

    #[test]
    fn huge_span_saturates() {
        let now = utc(2025, 2, 15, 12, 0);
        let window = TimeWindow::around(now, 100_000_000);
        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.end, DateTime::<Utc>::MAX_UTC);
        assert!(window.contains(now));

        let widest = TimeWindow::around(now, i64::MAX);
        assert_eq!(widest.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(widest.end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn bounds_are_inclusive() {
        let now = utc(2025, 2, 15, 12, 0);
        let window = TimeWindow::around(now, 30);

        assert!(window.contains(now));
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.start - Duration::seconds(1)));
        assert!(!window.contains(window.end + Duration::seconds(1)));
    }

    #[test]
    fn serde_roundtrip() {
        let window = TimeWindow::around(utc(2025, 2, 15, 12, 0), 2);
        let json = serde_json::to_string(&window).unwrap();
        let parsed: TimeWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(window, parsed);
    }
}
