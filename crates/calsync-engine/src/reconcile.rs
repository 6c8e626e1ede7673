//! The reconciliation run.
//!
//! One run walks fixed phases, checking for cancellation after each:
//!
//! ```text
//! Idle → LoadingMapping → CleaningMapping → Windowing → CrossLinking
//!      → Classifying → Done | Cancelled | Failed
//! ```
//!
//! Cleaning works on a run-local copy of the mapping. The engine adopts the
//! copy only when the run reaches `Done`, so a cancelled or failed run
//! leaves the engine's mapping untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;

use calsync_core::{CalendarEntry, ChangeKind, ModifiedEntry, TimeWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::mapping::{IdentifierMapping, is_storable_identifier};
use crate::store::MappingStore;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run has started.
    Idle,
    /// Reading the persisted mapping.
    LoadingMapping,
    /// Dropping pairs whose ids are gone from either side.
    CleaningMapping,
    /// Selecting single entries that start inside the window.
    Windowing,
    /// Attaching counterpart ids through the mapping.
    CrossLinking,
    /// Emitting New, Modified and Removed changes.
    Classifying,
    /// The run finished and produced a [`Reconciliation`].
    Done,
    /// A cancellation request stopped the run.
    Cancelled,
    /// Loading the mapping failed.
    Failed,
}

impl RunPhase {
    /// Progress percentage reached when the phase starts.
    ///
    /// Terminal failure states have no milestone.
    pub fn milestone(&self) -> Option<u8> {
        match self {
            Self::Idle => Some(0),
            Self::LoadingMapping => Some(10),
            Self::CleaningMapping => Some(20),
            Self::Windowing => Some(25),
            Self::CrossLinking => Some(40),
            Self::Classifying => Some(60),
            Self::Done => Some(100),
            Self::Cancelled | Self::Failed => None,
        }
    }

    /// Lowercase name used in logs and progress output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingMapping => "loading mapping",
            Self::CleaningMapping => "cleaning mapping",
            Self::Windowing => "windowing",
            Self::CrossLinking => "cross-linking",
            Self::Classifying => "classifying",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress reported once New and Modified are classified.
const CLASSIFIED_CHANGES_PROGRESS: u8 = 80;

/// Callback receiving `(phase, percent)` updates.
pub type ProgressFn = Box<dyn Fn(RunPhase, u8) + Send + Sync>;

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Source entries inside the window.
    pub windowed: usize,
    /// Source entries dropped because they repeat.
    pub excluded_repeating: usize,
    /// Source entries dropped because they start outside the window.
    pub excluded_out_of_window: usize,
    /// Changes classified as New.
    pub new: usize,
    /// Changes classified as Modified.
    pub modified: usize,
    /// Changes classified as Removed.
    pub removed: usize,
    /// Mapping pairs dropped during cleaning.
    pub mappings_pruned: usize,
}

/// The classified outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// New, then Modified, then Removed.
    pub changes: Vec<ModifiedEntry>,
    /// Counters for the run.
    pub stats: ReconcileStats,
}

impl Reconciliation {
    /// Returns true when the destination is already in step.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns changes of one kind.
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &ModifiedEntry> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

/// What [`ReconciliationEngine::commit_mappings`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Pairs recorded for applied New and Modified changes.
    pub added: usize,
    /// Pairs removed for applied Removed changes.
    pub dropped: usize,
    /// Applied entries whose ids could not be stored.
    pub skipped: usize,
}

/// Reconciles a source calendar into a destination calendar.
pub struct ReconciliationEngine {
    config: EngineConfig,
    store: Option<MappingStore>,
    mapping: IdentifierMapping,
    phase: RunPhase,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("pairs", &self.mapping.len())
            .field("phase", &self.phase)
            .finish()
    }
}

impl ReconciliationEngine {
    /// Opens the mapping store (taking its lock if configured) and loads it.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let store = MappingStore::open(&config.mapping_path, config.use_lock)?;
        let mapping = store.load()?;
        Ok(Self {
            config,
            store: Some(store),
            mapping,
            phase: RunPhase::Idle,
            progress: None,
        })
    }

    /// Creates an engine over an in-memory mapping that is never persisted.
    pub fn detached(config: EngineConfig, mapping: IdentifierMapping) -> Self {
        Self {
            config,
            store: None,
            mapping,
            phase: RunPhase::Idle,
            progress: None,
        }
    }

    /// Builder: receive `(phase, percent)` updates.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(RunPhase, u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the committed mapping.
    ///
    /// Cleaning during a run only becomes visible here once the run completes.
    pub fn mapping(&self) -> &IdentifierMapping {
        &self.mapping
    }

    /// Returns the phase of the current or last run.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        if let Some(percent) = phase.milestone() {
            self.report(phase, percent);
        }
    }

    fn report(&self, phase: RunPhase, percent: u8) {
        if let Some(ref progress) = self.progress {
            progress(phase, percent);
        }
    }

    fn checkpoint(&mut self, cancel: &CancelToken) -> EngineResult<()> {
        if cancel.is_cancelled() {
            let last_completed = self.phase;
            info!(phase = %last_completed, "Reconciliation cancelled");
            self.phase = RunPhase::Cancelled;
            return Err(EngineError::Cancelled { last_completed });
        }
        Ok(())
    }

    /// Classifies what must change in `destination` to mirror `source`.
    ///
    /// `source` and `destination` are the full entry collections of each
    /// side, normalized so that source entries carry `source_id` and
    /// destination entries carry `destination_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if `cancel` fires between phases and
    /// [`EngineError::MappingLoad`] if the mapping cannot be reloaded.
    pub fn reconcile(
        &mut self,
        source: &[CalendarEntry],
        destination: &[CalendarEntry],
        now: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Reconciliation> {
        let span = info_span!("reconcile", source = source.len(), destination = destination.len());
        let _enter = span.enter();

        self.enter(RunPhase::Idle);
        let mut stats = ReconcileStats::default();

        self.enter(RunPhase::LoadingMapping);
        let mut mapping = match self.store {
            Some(ref store) => match store.load() {
                Ok(mapping) => mapping,
                Err(e) => {
                    self.phase = RunPhase::Failed;
                    return Err(e);
                }
            },
            None => self.mapping.clone(),
        };
        self.checkpoint(cancel)?;

        self.enter(RunPhase::CleaningMapping);
        stats.mappings_pruned = clean_mapping(&mut mapping, source, destination);
        debug!(pruned = stats.mappings_pruned, remaining = mapping.len(), "Cleaned mapping");
        self.checkpoint(cancel)?;

        self.enter(RunPhase::Windowing);
        let window = TimeWindow::around(now, self.config.window_days);
        let windowed = window_source(source, &window, &mut stats);
        debug!(
            windowed = stats.windowed,
            repeating = stats.excluded_repeating,
            out_of_window = stats.excluded_out_of_window,
            "Windowed source entries"
        );
        self.checkpoint(cancel)?;

        self.enter(RunPhase::CrossLinking);
        let linked_source = link_source(windowed, &mapping);
        let linked_destination = link_destination(destination, &mapping);
        self.checkpoint(cancel)?;

        self.enter(RunPhase::Classifying);
        let mut changes = classify_new(&linked_source, &linked_destination);
        changes.extend(classify_modified(&linked_source, &linked_destination));
        self.report(RunPhase::Classifying, CLASSIFIED_CHANGES_PROGRESS);
        changes.extend(classify_removed(&linked_source, &linked_destination));

        for change in &changes {
            match change.kind {
                ChangeKind::New => stats.new += 1,
                ChangeKind::Modified => stats.modified += 1,
                ChangeKind::Removed => stats.removed += 1,
            }
        }
        self.checkpoint(cancel)?;

        self.mapping = mapping;
        self.enter(RunPhase::Done);
        info!(
            new = stats.new,
            modified = stats.modified,
            removed = stats.removed,
            "Reconciliation complete"
        );

        Ok(Reconciliation { changes, stats })
    }

    /// Records the pairs created by applied changes and flushes the mapping.
    ///
    /// Only changes whose status is `Applied` count: New and Modified add
    /// their `source_id`/`destination_id` pair, Removed drops the pair of its
    /// destination id.
    pub fn commit_mappings(&mut self, changes: &[ModifiedEntry]) -> EngineResult<CommitSummary> {
        let mut summary = CommitSummary::default();

        for change in changes.iter().filter(|c| c.status.is_applied()) {
            let entry = &change.entry;
            match change.kind {
                ChangeKind::New | ChangeKind::Modified => {
                    let (Some(source), Some(destination)) =
                        (entry.source_id.as_deref(), entry.destination_id.as_deref())
                    else {
                        continue;
                    };
                    if !is_storable_identifier(source) || !is_storable_identifier(destination) {
                        warn!(
                            source_id = source,
                            destination_id = destination,
                            "Identifier cannot be stored in the mapping, skipping"
                        );
                        summary.skipped += 1;
                        continue;
                    }
                    self.mapping.add_pair(source, destination);
                    summary.added += 1;
                }
                ChangeKind::Removed => {
                    if let Some(destination) = entry.destination_id.as_deref() {
                        if self.mapping.remove_by_destination(destination).is_some() {
                            summary.dropped += 1;
                        }
                    }
                }
            }
        }

        self.flush()?;
        debug!(
            added = summary.added,
            dropped = summary.dropped,
            skipped = summary.skipped,
            "Committed mappings"
        );
        Ok(summary)
    }

    /// Writes the current mapping to the store, if any.
    pub fn flush(&self) -> EngineResult<()> {
        match self.store {
            Some(ref store) => store.save(&self.mapping),
            None => Ok(()),
        }
    }
}

/// Drops pairs whose source id or destination id no longer exists.
fn clean_mapping(
    mapping: &mut IdentifierMapping,
    source: &[CalendarEntry],
    destination: &[CalendarEntry],
) -> usize {
    let source_ids: HashSet<&str> = source.iter().filter_map(|e| e.source_id.as_deref()).collect();
    let destination_ids: HashSet<&str> = destination
        .iter()
        .filter_map(|e| e.destination_id.as_deref())
        .collect();

    mapping.retain_sources(|id| source_ids.contains(id))
        + mapping.retain_destinations(|id| destination_ids.contains(id))
}

/// Keeps single source entries starting inside `window`.
fn window_source<'a>(
    source: &'a [CalendarEntry],
    window: &TimeWindow,
    stats: &mut ReconcileStats,
) -> Vec<&'a CalendarEntry> {
    let mut windowed = Vec::new();
    for entry in source {
        if entry.is_repeating() {
            stats.excluded_repeating += 1;
        } else if !window.contains(entry.start()) {
            stats.excluded_out_of_window += 1;
        } else {
            windowed.push(entry);
        }
    }
    stats.windowed = windowed.len();
    windowed
}

fn link_source(windowed: Vec<&CalendarEntry>, mapping: &IdentifierMapping) -> Vec<CalendarEntry> {
    windowed
        .into_iter()
        .map(|entry| {
            let mut linked = entry.clone();
            linked.destination_id = entry
                .source_id
                .as_deref()
                .and_then(|id| mapping.destination_for(id))
                .map(str::to_string);
            linked
        })
        .collect()
}

fn link_destination(destination: &[CalendarEntry], mapping: &IdentifierMapping) -> Vec<CalendarEntry> {
    destination
        .iter()
        .map(|entry| {
            let mut linked = entry.clone();
            linked.source_id = entry
                .destination_id
                .as_deref()
                .and_then(|id| mapping.source_for(id))
                .map(str::to_string);
            linked
        })
        .collect()
}

fn classify_new(source: &[CalendarEntry], destination: &[CalendarEntry]) -> Vec<ModifiedEntry> {
    let referenced: HashSet<&str> = destination
        .iter()
        .filter_map(|e| e.source_id.as_deref())
        .collect();

    source
        .iter()
        .filter(|entry| entry.destination_id.is_none())
        .filter(|entry| match entry.source_id.as_deref() {
            Some(id) => !referenced.contains(id),
            None => {
                warn!(subject = %entry.subject, "Source entry has no id, it cannot be linked");
                true
            }
        })
        .map(|entry| ModifiedEntry::new_entry(entry.clone()))
        .collect()
}

fn classify_modified(source: &[CalendarEntry], destination: &[CalendarEntry]) -> Vec<ModifiedEntry> {
    let by_id: HashMap<&str, &CalendarEntry> = destination
        .iter()
        .filter_map(|e| e.destination_id.as_deref().map(|id| (id, e)))
        .collect();

    source
        .iter()
        .filter_map(|entry| {
            let counterpart = by_id.get(entry.destination_id.as_deref()?)?;
            let fields = entry.differences(counterpart);
            if fields.is_empty() {
                return None;
            }
            debug!(subject = %entry.subject, fields = ?fields, "Entry modified");
            Some(ModifiedEntry::modified(entry.clone(), fields))
        })
        .collect()
}

fn classify_removed(source: &[CalendarEntry], destination: &[CalendarEntry]) -> Vec<ModifiedEntry> {
    let referenced: HashSet<&str> = source
        .iter()
        .filter_map(|e| e.destination_id.as_deref())
        .collect();

    destination
        .iter()
        .filter(|entry| match entry.destination_id.as_deref() {
            Some(id) => !referenced.contains(id),
            None => {
                warn!(subject = %entry.subject, "Destination entry has no id, skipping");
                false
            }
        })
        .map(|entry| ModifiedEntry::removed(entry.clone()))
        .collect()
}
