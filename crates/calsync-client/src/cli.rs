//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// calsync - mirror one calendar into another
#[derive(Debug, Parser)]
#[command(name = "calsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile the source calendar into the destination
    Sync(SyncArgs),

    /// Infer a recurrence pattern from occurrence timestamps
    Infer(InferArgs),

    /// Identifier mapping commands
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `calsync sync`.
#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// Source calendar file (overrides [source] path)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Destination calendar file (overrides [destination] path)
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// Write the changes; without this only the plan is printed
    #[arg(long)]
    pub apply: bool,

    /// Reconcile entries starting within this many days of now
    #[arg(long)]
    pub window_days: Option<i64>,

    /// Mapping file (overrides [sync] mapping_path)
    #[arg(long)]
    pub mapping: Option<PathBuf>,
}

/// Arguments of `calsync infer`.
#[derive(Debug, Clone, Args)]
pub struct InferArgs {
    /// Occurrence start times in RFC 3339 (e.g. 2025-02-05T10:00:00+01:00)
    #[arg(required = true, num_args = 1..)]
    pub occurrences: Vec<String>,

    /// Read weekdays and days of month in UTC instead of the local zone
    #[arg(long)]
    pub utc: bool,

    /// Print the recurrence descriptor as JSON
    #[arg(long)]
    pub json: bool,
}

/// Mapping actions.
#[derive(Debug, Subcommand)]
pub enum MappingAction {
    /// Print the stored identifier pairs
    Show,

    /// Show the mapping file path
    Path,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
