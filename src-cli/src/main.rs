use std::process::ExitCode;

use clap::Parser;
use nyaya_core::config::AgentConfig;
use nyaya_core::error::AppError;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{CliArgs, Command};

/// Uses `RUST_LOG` when set, otherwise the verbosity flags. Logs go to stderr
/// so stdout carries only the JSON result.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("OUTPUT_ENCODE_FAILED", "Failed to encode command output")
            .with_details(e.to_string())
    })?;
    println!("{text}");
    Ok(())
}

fn run(args: CliArgs) -> Result<(), AppError> {
    let config = AgentConfig::load(args.config.as_deref())?;
    match args.command {
        Command::Ingest {
            dir,
            taluk,
            pincode,
        } => print_json(&commands::ingest(&config, dir, taluk, pincode)?),
        Command::Ask {
            question,
            language,
            taluk,
        } => print_json(&commands::ask(
            config,
            &question,
            language.as_deref(),
            taluk.as_deref(),
        )?),
        Command::Status => print_json(&commands::status(&config)?),
        Command::Feedback { query_id, rating } => {
            print_json(&commands::feedback(&config, &query_id, rating)?)
        }
        Command::ExportFeedback { path } => print_json(&commands::export_feedback(&config, &path)?),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code, retryable = e.retryable, "{}", e.message);
            match serde_json::to_string_pretty(&e) {
                Ok(text) => eprintln!("{text}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}
