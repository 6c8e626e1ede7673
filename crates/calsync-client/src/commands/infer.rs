//! Recurrence inference command.

use calsync_core::RecurrencePattern;
use chrono::{DateTime, Utc};

use crate::cli::InferArgs;
use crate::error::{ClientError, ClientResult};

/// Infer and print the pattern behind the given occurrences.
pub fn run(args: &InferArgs) -> ClientResult<()> {
    let pattern = infer(&args.occurrences, args.utc)?;

    if args.json {
        let json = serde_json::to_string_pretty(&pattern.to_descriptor())
            .map_err(|e| ClientError::Input(format!("failed to serialize descriptor: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", pattern);
        println!("first: {}", pattern.first_occurrence().to_rfc3339());
        println!("last:  {}", pattern.last_occurrence().to_rfc3339());
    }
    Ok(())
}

/// Parses RFC 3339 timestamps and infers their pattern.
///
/// Weekdays and days of month are read in UTC when `utc` is set, otherwise
/// in the local zone.
pub fn infer(raw: &[String], utc: bool) -> ClientResult<RecurrencePattern> {
    let mut occurrences = raw
        .iter()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| ClientError::Input(format!("{}: {}", s, e)))
        })
        .collect::<ClientResult<Vec<_>>>()?;
    occurrences.sort();

    let pattern = if utc {
        RecurrencePattern::infer(&occurrences, &Utc)?
    } else {
        RecurrencePattern::infer_local(&occurrences)?
    };
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calsync_core::{PatternError, RecurrenceKind};
    use chrono::Weekday;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn weekly_in_utc() {
        let pattern = infer(
            &strings(&[
                "2025-02-17T10:00:00Z",
                "2025-02-03T10:00:00Z",
                "2025-02-10T10:00:00Z",
            ]),
            true,
        )
        .unwrap();

        assert_eq!(
            *pattern.kind(),
            RecurrenceKind::Weekly {
                day_of_week: Weekday::Mon,
                interval: 1,
            }
        );
        assert_eq!(pattern.occurrence_count(), 3);
        assert_eq!(pattern.to_string(), "weekly on Mon (3 occurrences)");
    }

    #[test]
    fn offsets_are_normalized() {
        let pattern = infer(
            &strings(&["2025-02-03T11:00:00+01:00", "2025-02-04T10:00:00Z"]),
            true,
        )
        .unwrap();
        assert_eq!(*pattern.kind(), RecurrenceKind::Daily { interval: 1 });
    }

    #[test]
    fn single_occurrence_is_rejected() {
        let err = infer(&strings(&["2025-02-03T10:00:00Z"]), true).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Pattern(PatternError::InvalidOccurrenceCount { count: 1 })
        ));
    }

    #[test]
    fn bad_timestamp_is_input_error() {
        let err = infer(&strings(&["yesterday", "2025-02-03T10:00:00Z"]), true).unwrap_err();
        assert!(matches!(err, ClientError::Input(_)));
        assert!(err.to_string().contains("yesterday"));
    }
}
