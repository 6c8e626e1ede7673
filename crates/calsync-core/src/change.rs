//! Classified change records produced by reconciliation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::CalendarEntry;

/// How a destination entry must change to match the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Create the entry in the destination.
    New,
    /// Update the existing destination entry.
    Modified,
    /// Delete the destination entry.
    Removed,
}

impl ChangeKind {
    /// One-character marker used in plan listings.
    pub fn symbol(&self) -> char {
        match self {
            Self::New => '+',
            Self::Modified => '~',
            Self::Removed => '-',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of writing one change to the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ApplyStatus {
    /// Not written yet.
    #[default]
    Pending,
    /// Written successfully.
    Applied,
    /// Left alone because the caller cleared the apply flag.
    Skipped,
    /// The destination rejected the change.
    Failed(String),
}

impl ApplyStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One classified change, ready for a destination writer.
///
/// Built fresh on every run and never persisted, so it only serializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifiedEntry {
    pub kind: ChangeKind,
    /// The source entry for New and Modified, the destination entry for Removed.
    pub entry: CalendarEntry,
    /// Differing field names; only populated for Modified.
    pub changed_fields: Vec<&'static str>,
    /// Whether the writer should act on this change.
    pub apply_modification: bool,
    pub status: ApplyStatus,
}

impl ModifiedEntry {
    /// A change creating `entry` in the destination.
    pub fn new_entry(entry: CalendarEntry) -> Self {
        Self::with_kind(ChangeKind::New, entry, Vec::new())
    }

    /// A change updating the destination with `entry`.
    pub fn modified(entry: CalendarEntry, changed_fields: Vec<&'static str>) -> Self {
        Self::with_kind(ChangeKind::Modified, entry, changed_fields)
    }

    /// A change deleting the destination `entry`.
    pub fn removed(entry: CalendarEntry) -> Self {
        Self::with_kind(ChangeKind::Removed, entry, Vec::new())
    }

    fn with_kind(kind: ChangeKind, entry: CalendarEntry, changed_fields: Vec<&'static str>) -> Self {
        Self {
            kind,
            entry,
            changed_fields,
            apply_modification: true,
            status: ApplyStatus::Pending,
        }
    }

    /// Builder method to set the apply flag.
    #[must_use]
    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply_modification = apply;
        self
    }
}

impl fmt::Display for ModifiedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.kind.symbol(),
            self.entry.subject,
            self.entry.start().format("%Y-%m-%d %H:%M")
        )?;
        if !self.changed_fields.is_empty() {
            write!(f, " [{}]", self.changed_fields.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(subject: &str) -> CalendarEntry {
        let start = Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 5, 11, 0, 0).unwrap();
        CalendarEntry::new(subject, start, end).unwrap()
    }

    #[test]
    fn kind_symbols() {
        assert_eq!(ChangeKind::New.symbol(), '+');
        assert_eq!(ChangeKind::Modified.symbol(), '~');
        assert_eq!(ChangeKind::Removed.symbol(), '-');
        assert_eq!(ChangeKind::Modified.to_string(), "modified");
    }

    #[test]
    fn constructors_default_to_apply() {
        let change = ModifiedEntry::new_entry(entry("Standup"));
        assert_eq!(change.kind, ChangeKind::New);
        assert!(change.apply_modification);
        assert_eq!(change.status, ApplyStatus::Pending);
        assert!(change.changed_fields.is_empty());

        let change = ModifiedEntry::removed(entry("Standup")).with_apply(false);
        assert_eq!(change.kind, ChangeKind::Removed);
        assert!(!change.apply_modification);
    }

    #[test]
    fn display() {
        let change = ModifiedEntry::modified(entry("Standup"), vec!["Subject", "Location"]);
        assert_eq!(
            change.to_string(),
            "~ Standup (2025-02-05 10:00) [Subject, Location]"
        );
        assert_eq!(
            ModifiedEntry::new_entry(entry("Retro")).to_string(),
            "+ Retro (2025-02-05 10:00)"
        );
    }

    #[test]
    fn status_helpers() {
        assert!(ApplyStatus::Applied.is_applied());
        assert!(ApplyStatus::Failed("boom".to_string()).is_failed());
        assert!(!ApplyStatus::Skipped.is_applied());
    }
}
