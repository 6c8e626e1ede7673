//! Error types for core operations.

use thiserror::Error;

/// Errors produced while deriving or translating a recurrence pattern.
///
/// These are returned as values so that callers can pick a fallback, such as
/// keeping the raw occurrence list when no pattern fits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The occurrences do not reduce to any supported repeat shape.
    #[error("no recurrence pattern matches the occurrence list")]
    NoPatternFound,

    /// Fewer than two occurrences were supplied.
    #[error("recurrence inference needs at least 2 occurrences, got {count}")]
    InvalidOccurrenceCount { count: usize },

    /// A foreign recurrence descriptor used a kind this crate does not model.
    #[error("unknown recurrence kind: {kind}")]
    UnknownRecurrenceKind { kind: String },
}

/// Errors produced by core entry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An entry would end before it starts.
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: String, end: String },

    /// Recurrence handling failed.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl CoreError {
    /// Creates an invalid time range error.
    pub fn invalid_time_range(start: impl ToString, end: impl ToString) -> Self {
        Self::InvalidTimeRange {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for recurrence inference and translation.
pub type PatternResult<T> = Result<T, PatternError>;
