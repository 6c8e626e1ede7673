//! The sync command: reconcile, print the plan, optionally apply it.

use std::fmt::Write as _;
use std::path::PathBuf;

use calsync_engine::{
    ApplyReport, CancelHandle, CancelToken, CommitSummary, Reconciliation, ReconciliationEngine,
    apply_changes,
};
use calsync_providers::{CalendarSource, JsonFileCalendar};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cli::SyncArgs;
use crate::config::{CalendarSettings, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// What a sync run did.
#[derive(Debug)]
pub struct SyncOutcome {
    /// The classified changes; after an apply each carries its status.
    pub plan: Reconciliation,
    /// Present when `--apply` was given.
    pub applied: Option<Applied>,
}

#[derive(Debug)]
pub struct Applied {
    pub report: ApplyReport,
    pub commit: CommitSummary,
}

/// Run the sync command, cancelling on Ctrl-C.
pub async fn run(config: &ClientConfig, args: &SyncArgs) -> ClientResult<()> {
    let cancel = CancelHandle::new();
    cancel.cancel_on_ctrl_c();

    let outcome = execute(config, args, Utc::now(), &cancel.token()).await?;
    print!("{}", render_plan(&outcome.plan));

    match outcome.applied {
        None => {
            if !outcome.plan.is_empty() {
                println!("Dry run; pass --apply to write these changes.");
            }
            Ok(())
        }
        Some(applied) => {
            print!("{}", render_report(&applied.report, &applied.commit));
            if applied.report.cancelled {
                Err(ClientError::Interrupted)
            } else if !applied.report.failures.is_empty() {
                Err(ClientError::Apply {
                    failed: applied.report.failures.len(),
                })
            } else {
                Ok(())
            }
        }
    }
}

/// Reconciles the configured calendars at `now` and, with `--apply`, writes
/// the changes and commits the mapping.
pub async fn execute(
    config: &ClientConfig,
    args: &SyncArgs,
    now: DateTime<Utc>,
    cancel: &CancelToken,
) -> ClientResult<SyncOutcome> {
    let source_path = resolve_path(&args.source, &config.source, "source")?;
    let destination_path = resolve_path(&args.destination, &config.destination, "destination")?;
    if source_path == destination_path {
        return Err(ClientError::Config(format!(
            "source and destination point to the same file: {}",
            source_path.display()
        )));
    }

    let mut engine_config = config.engine_config();
    if let Some(days) = args.window_days {
        if days < 0 {
            return Err(ClientError::Input(format!(
                "--window-days must not be negative, got {}",
                days
            )));
        }
        engine_config = engine_config.with_window_days(days);
    }
    if let Some(ref mapping) = args.mapping {
        engine_config.mapping_path = mapping.clone();
    }

    let source = calendar(JsonFileCalendar::source(source_path), &config.source);
    let destination = calendar(
        JsonFileCalendar::destination(destination_path),
        &config.destination,
    );

    let fetched_source = source.fetch_entries().await?;
    let fetched_destination = destination.fetch_entries().await?;
    for (name, skipped) in [
        (source.name(), fetched_source.skipped),
        (destination.name(), fetched_destination.skipped),
    ] {
        if skipped > 0 {
            warn!(calendar = name, skipped = skipped, "Some entries could not be read");
        }
    }
    info!(
        source = fetched_source.entries.len(),
        destination = fetched_destination.entries.len(),
        "Fetched calendars"
    );

    let mut engine = ReconciliationEngine::open(engine_config)?.with_progress(|phase, percent| {
        debug!(phase = %phase, percent = percent, "Reconciliation progress");
    });
    let plan = engine.reconcile(
        &fetched_source.entries,
        &fetched_destination.entries,
        now,
        cancel,
    )?;

    if !args.apply {
        return Ok(SyncOutcome {
            plan,
            applied: None,
        });
    }

    let Reconciliation { mut changes, stats } = plan;
    let report = apply_changes(&destination, &mut changes, cancel).await;
    // Commit even after failures or cancellation so applied changes keep their pairs.
    let commit = engine.commit_mappings(&changes)?;

    Ok(SyncOutcome {
        plan: Reconciliation { changes, stats },
        applied: Some(Applied { report, commit }),
    })
}

fn resolve_path(
    flag: &Option<PathBuf>,
    settings: &CalendarSettings,
    side: &str,
) -> ClientResult<PathBuf> {
    flag.clone()
        .or_else(|| settings.path.clone())
        .ok_or_else(|| {
            ClientError::Config(format!(
                "no {side} calendar: pass --{side} or set [{side}] path in {}",
                ClientConfig::default_path().display()
            ))
        })
}

fn calendar(calendar: JsonFileCalendar, settings: &CalendarSettings) -> JsonFileCalendar {
    match settings.name {
        Some(ref name) => calendar.with_name(name),
        None => calendar,
    }
}

/// One line per change followed by a summary line.
pub fn render_plan(plan: &Reconciliation) -> String {
    let mut out = String::new();
    for change in &plan.changes {
        let _ = writeln!(out, "{}", change);
    }

    let stats = &plan.stats;
    let skipped = stats.excluded_repeating + stats.excluded_out_of_window;
    if plan.is_empty() {
        let _ = writeln!(
            out,
            "Nothing to do ({} in window, {} skipped).",
            stats.windowed, skipped
        );
    } else {
        let _ = writeln!(
            out,
            "{} new, {} modified, {} removed ({} in window, {} skipped).",
            stats.new, stats.modified, stats.removed, stats.windowed, skipped
        );
    }
    out
}

/// Failure lines followed by the apply and mapping totals.
pub fn render_report(report: &ApplyReport, commit: &CommitSummary) -> String {
    let mut out = String::new();
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "! {} {}: {}",
            failure.kind.symbol(),
            failure.subject,
            failure.message
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "Interrupted; remaining changes were not applied.");
    }
    let _ = writeln!(
        out,
        "Applied {}, skipped {}, failed {}. Mapping: {} added, {} dropped.",
        report.applied,
        report.skipped,
        report.failures.len(),
        commit.added,
        commit.dropped
    );
    out
}
