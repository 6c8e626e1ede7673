//! Batch writer applying classified changes to a destination.

use calsync_core::{ApplyStatus, ChangeKind, ModifiedEntry};
use calsync_providers::{CalendarDestination, ProviderError, ProviderResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;

/// A change the destination refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    /// Position of the change in the applied slice.
    pub index: usize,
    /// Kind of the refused change.
    pub kind: ChangeKind,
    /// Subject of the entry, for reporting.
    pub subject: String,
    /// The destination's error message.
    pub message: String,
}

/// Outcome of [`apply_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Changes the destination accepted.
    pub applied: usize,
    /// Changes whose apply flag was off.
    pub skipped: usize,
    /// Changes the destination refused, in batch order.
    pub failures: Vec<ApplyFailure>,
    /// Set when cancellation stopped the batch early; the remaining changes
    /// stay `Pending`.
    pub cancelled: bool,
}

impl ApplyReport {
    /// Returns true when every change ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Writes `changes` to `destination` in order, recording each status.
///
/// A failing change is marked `Failed` and the batch continues. New entries
/// get the created `destination_id` so their pair can be committed to the
/// mapping afterwards.
pub async fn apply_changes(
    destination: &dyn CalendarDestination,
    changes: &mut [ModifiedEntry],
    cancel: &CancelToken,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (index, change) in changes.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            info!(stopped_at = index, "Apply cancelled");
            report.cancelled = true;
            break;
        }

        if !change.apply_modification {
            change.status = ApplyStatus::Skipped;
            report.skipped += 1;
            continue;
        }

        match apply_one(destination, change).await {
            Ok(()) => {
                debug!(kind = %change.kind, subject = %change.entry.subject, "Applied change");
                change.status = ApplyStatus::Applied;
                report.applied += 1;
            }
            Err(e) => {
                warn!(
                    kind = %change.kind,
                    subject = %change.entry.subject,
                    error = %e,
                    "Failed to apply change"
                );
                let message = e.to_string();
                report.failures.push(ApplyFailure {
                    index,
                    kind: change.kind,
                    subject: change.entry.subject.clone(),
                    message: message.clone(),
                });
                change.status = ApplyStatus::Failed(message);
            }
        }
    }

    info!(
        destination = destination.name(),
        applied = report.applied,
        skipped = report.skipped,
        failed = report.failures.len(),
        "Applied changes"
    );
    report
}

async fn apply_one(
    destination: &dyn CalendarDestination,
    change: &mut ModifiedEntry,
) -> ProviderResult<()> {
    match change.kind {
        ChangeKind::New => {
            let id = destination.create_entry(&change.entry).await?;
            change.entry.destination_id = Some(id);
            Ok(())
        }
        ChangeKind::Modified => {
            let id = required_id(change)?;
            destination.update_entry(&id, &change.entry).await
        }
        ChangeKind::Removed => {
            let id = required_id(change)?;
            destination.delete_entry(&id).await
        }
    }
}

fn required_id(change: &ModifiedEntry) -> ProviderResult<String> {
    change.entry.destination_id.clone().ok_or_else(|| {
        ProviderError::invalid_data(format!(
            "{} entry '{}' has no destination id",
            change.kind, change.entry.subject
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelHandle;
    use calsync_core::CalendarEntry;
    use calsync_providers::{MemoryCalendar, Side};
    use chrono::{DateTime, Duration, Utc};

    fn entry(subject: &str) -> CalendarEntry {
        let start: DateTime<Utc> = "2025-02-05T10:00:00Z".parse().unwrap();
        CalendarEntry::new(subject, start, start + Duration::minutes(30)).unwrap()
    }

    fn outlook() -> MemoryCalendar {
        MemoryCalendar::new("outlook", Side::Destination).with_id_prefix("o")
    }

    #[tokio::test]
    async fn new_entries_get_destination_ids() {
        let cal = outlook();
        let mut changes = vec![ModifiedEntry::new_entry(entry("Budget").with_source_id("n1"))];

        let report = apply_changes(&cal, &mut changes, &CancelToken::never()).await;
        assert!(report.is_success());
        assert_eq!(report.applied, 1);
        assert_eq!(changes[0].status, ApplyStatus::Applied);
        assert_eq!(changes[0].entry.destination_id.as_deref(), Some("o1"));
        assert_eq!(changes[0].entry.source_id.as_deref(), Some("n1"));
        assert_eq!(cal.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_existing() {
        let cal = outlook().with_entries(vec![
            entry("Standup").with_destination_id("o1"),
            entry("Retro").with_destination_id("o2"),
        ]);
        let mut changes = vec![
            ModifiedEntry::modified(
                entry("Standup").with_location("Room 4").with_destination_id("o1"),
                vec!["Location"],
            ),
            ModifiedEntry::removed(entry("Retro").with_destination_id("o2")),
        ];

        let report = apply_changes(&cal, &mut changes, &CancelToken::never()).await;
        assert_eq!(report.applied, 2);

        let stored = cal.snapshot().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].location, "Room 4");
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let cal = outlook().rejecting("Secret");
        let mut changes = vec![
            ModifiedEntry::new_entry(entry("Secret").with_source_id("n1")),
            ModifiedEntry::modified(entry("No id"), vec!["Body"]),
            ModifiedEntry::new_entry(entry("Public").with_source_id("n3")),
        ];

        let report = apply_changes(&cal, &mut changes, &CancelToken::never()).await;
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[1].kind, ChangeKind::Modified);
        assert!(changes[0].status.is_failed());
        assert!(changes[0].entry.destination_id.is_none());
        assert!(changes[1].status.is_failed());
        assert!(changes[2].status.is_applied());
    }

    #[tokio::test]
    async fn apply_flag_off_is_skipped() {
        let cal = outlook();
        let mut changes =
            vec![ModifiedEntry::new_entry(entry("Draft").with_source_id("n1")).with_apply(false)];

        let report = apply_changes(&cal, &mut changes, &CancelToken::never()).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(changes[0].status, ApplyStatus::Skipped);
        assert!(cal.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_batch_leaves_pending() {
        let cal = outlook();
        let handle = CancelHandle::new();
        handle.cancel();
        let mut changes = vec![ModifiedEntry::new_entry(entry("Later").with_source_id("n1"))];

        let report = apply_changes(&cal, &mut changes, &handle.token()).await;
        assert!(report.cancelled);
        assert!(!report.is_success());
        assert_eq!(changes[0].status, ApplyStatus::Pending);
    }
}
