//! calsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calsync_client::cli::{Cli, Command, ConfigAction, MappingAction};
use calsync_client::commands;
use calsync_client::config::ClientConfig;
use calsync_client::error::{ClientError, ClientResult};
use calsync_core::{TracingConfig, TracingOutputFormat, init_tracing};

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&cli, &config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_cancelled() {
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config),
        None => ClientConfig::load().map_err(ClientError::Config),
    }
}

fn init_logging(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let mut tracing_config = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };

    let format = match cli.log_format {
        Some(ref name) => Some(
            name.parse::<TracingOutputFormat>()
                .map_err(|e| ClientError::Input(format!("--log-format: {}", e)))?,
        ),
        None => config.tracing_format().map_err(ClientError::Config)?,
    };
    if let Some(format) = format {
        tracing_config = tracing_config.with_format(format);
    }

    init_tracing(tracing_config).map_err(|e| ClientError::Config(e.to_string()))
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    match cli.command {
        Some(Command::Sync(args)) => commands::sync::run(&config, &args).await,
        Some(Command::Infer(args)) => commands::infer::run(&args),
        Some(Command::Mapping { action }) => match action {
            MappingAction::Show => commands::mapping::show(&config),
            MappingAction::Path => commands::mapping::path(&config),
        },
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        None => {
            println!("calsync - mirror one calendar into another");
            println!();
            println!("Run 'calsync --help' for usage information.");
            println!();
            println!("Quick start:");
            println!("  1. Preview: calsync sync --source notes.json --destination outlook.json");
            println!("  2. Apply:   calsync sync --source notes.json --destination outlook.json --apply");
            Ok(())
        }
    }
}
