//! Core types for calsync: recurrence inference, calendar entries, change
//! records and shared tracing setup.

pub mod change;
pub mod entry;
pub mod error;
pub mod interval;
pub mod recurrence;
pub mod time;
pub mod tracing;
pub mod weekday;

pub use change::{ApplyStatus, ChangeKind, ModifiedEntry};
pub use entry::CalendarEntry;
pub use error::{CoreError, CoreResult, PatternError, PatternResult};
pub use interval::IntervalSequence;
pub use recurrence::{RecurrenceDescriptor, RecurrenceKind, RecurrencePattern};
pub use time::TimeWindow;
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use weekday::WeekdaySet;
