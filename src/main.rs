//! chatserve - server half of a two-party, line-oriented TCP chat
//!
//! Listens on a single port, exchanges newline-terminated messages with one
//! client at a time, and returns to listening whenever the peer disconnects.
//! Typing `\quit` at the prompt ends the program.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatserve::config::{self, Config, ConfigManager};
use chatserve::{ConnectionManager, Result};

/// CLI arguments for chatserve
#[derive(Parser, Debug)]
#[command(name = "chatserve")]
#[command(about = "Server half of a two-party line-oriented chat")]
#[command(version)]
pub struct CliArgs {
    /// Port to listen on (1024-65535)
    pub port: String,

    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "chatserve.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,
}

fn main() -> ExitCode {
    // Argument and port validation happen before anything binds, with the
    // diagnostics on stderr and exit status 1.
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            _ => {
                eprintln!("Usage: chatserve <port number>");
                return ExitCode::FAILURE;
            }
        },
    };

    let port = match config::parse_port(&args.port) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args, port));

    // A terminal read parked on the blocking pool must not hold the
    // process open once the session is over.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs, port: u16) -> Result<()> {
    // Configuration priority: CLI arguments, then the config file, then
    // environment variables, then built-in defaults.
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(port, args.log_level.as_deref());
    config
        .validate()
        .context("configuration validation failed")?;

    init_tracing(&config)?;

    info!(
        "starting chatserve v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        port
    );

    let manager = ConnectionManager::new(Arc::new(config));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    manager.run_forever(stdin, tokio::io::stdout()).await
}

/// Initialize tracing/logging
fn init_tracing(config: &Config) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    // Logs go to stderr; stdout is the chat surface.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
