//! Reconciliation engine: identifier mapping, classification, batch apply.
//!
//! This crate decides what must change in a destination calendar so it
//! mirrors a source calendar:
//! - Persisted source/destination identifier mapping with a run lock
//! - Phased reconciliation with progress and cooperative cancellation
//! - Batch application of the classified changes
//!
//! # Example
//!
//! ```rust,no_run
//! use calsync_engine::{CancelToken, EngineConfig, ReconciliationEngine};
//!
//! # fn run(source: &[calsync_core::CalendarEntry], destination: &[calsync_core::CalendarEntry])
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = ReconciliationEngine::open(EngineConfig::default())?;
//! let result = engine.reconcile(source, destination, chrono::Utc::now(), &CancelToken::never())?;
//! for change in &result.changes {
//!     println!("{}", change);
//! }
//! # Ok(())
//! # }
//! ```

mod apply;
mod cancel;
mod config;
mod error;
mod mapping;
mod reconcile;
mod store;

pub use apply::{ApplyFailure, ApplyReport, apply_changes};
pub use cancel::{CancelHandle, CancelToken};
pub use config::{DEFAULT_WINDOW_DAYS, EngineConfig, default_mapping_path};
pub use error::{EngineError, EngineResult};
pub use mapping::{IdentifierMapping, MAPPING_HEADER, is_storable_identifier};
pub use reconcile::{
    CommitSummary, ProgressFn, ReconcileStats, Reconciliation, ReconciliationEngine, RunPhase,
};
pub use store::{MappingLock, MappingStore};
