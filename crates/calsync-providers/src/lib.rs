//! Calendar backends for calsync.
//!
//! - [`CalendarSource`] / [`CalendarDestination`] - the traits every backend implements
//! - [`RawEntry`] - backend-agnostic entry data before normalization
//! - [`normalize_entry`] - pipeline to convert raw entries to [`CalendarEntry`]
//! - [`JsonFileCalendar`], [`MemoryCalendar`] - bundled backends
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │  source file     │    │ destination file │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!     RawEntry list           RawEntry list
//!          │                       │
//!          ▼ normalize_entry()     ▼ normalize_entry()
//!   CalendarEntry (source_id)  CalendarEntry (destination_id)
//!          │                       ▲
//!          └──► engine ──► plan ───┘ denormalize_entry()
//! ```
//!
//! [`CalendarEntry`]: calsync_core::CalendarEntry

pub mod error;
pub mod json_file;
pub mod memory;
pub mod normalize;
pub mod provider;
pub mod raw_entry;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use json_file::JsonFileCalendar;
pub use memory::MemoryCalendar;
pub use normalize::{Side, denormalize_entry, normalize_entries, normalize_entry};
pub use provider::{BoxFuture, CalendarDestination, CalendarSource, FetchResult};
pub use raw_entry::{RawEntry, RawEntryTime, RawRecurrence};
