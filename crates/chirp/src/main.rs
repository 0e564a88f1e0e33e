//! Chirp - filtered fan-out relay
//!
//! # Usage
//!
//! ```bash
//! # Run the relay (default)
//! chirp
//! chirp --config configs/config.toml
//!
//! # Try a filter against a sample event
//! chirp check '{"contains": [{"var": "tweet"}, "rust"]}' --event '{"tweet": "Rust!"}'
//! ```

mod cmd;

use std::path::Path;

use anyhow::Result;
use chirp_config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Chirp - filtered fan-out relay
#[derive(Parser, Debug)]
#[command(name = "chirp")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // Global args that apply to serve when no subcommand given
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay
    Serve(cmd::serve::ServeArgs),

    /// Compile a filter and optionally evaluate it against an event
    Check(cmd::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(mut args)) => {
            // CLI global --config overrides subcommand config if both specified
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            let (level, format) = resolve_logging(cli.log_level.as_deref(), args.config.as_deref());
            init_logging(&level, format)?;
            cmd::serve::run(args).await
        }
        Some(Command::Check(args)) => {
            // Check only writes to stdout
            cmd::check::run(args)
        }
        // No subcommand = run the relay
        None => {
            let (level, format) = resolve_logging(cli.log_level.as_deref(), cli.config.as_deref());
            init_logging(&level, format)?;
            let args = cmd::serve::ServeArgs { config: cli.config };
            cmd::serve::run(args).await
        }
    }
}

/// Resolve log level and format
///
/// Level: CLI flag > config file > "info". Format: config file > console.
fn resolve_logging(cli_level: Option<&str>, config_path: Option<&Path>) -> (String, LogFormat) {
    let config = cmd::serve::find_config_path(config_path)
        .ok()
        .flatten()
        .and_then(|path| Config::from_file(path).ok());

    let level = match (cli_level, &config) {
        (Some(level), _) => level.to_string(),
        (None, Some(config)) => config.log.level.as_str().to_string(),
        (None, None) => "info".to_string(),
    };
    let format = config.map(|c| c.log.format).unwrap_or_default();

    (level, format)
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init(),
    }

    Ok(())
}
