//! # Ascend Sandbox
//!
//! Command-line stand-in for an in-game stat tester. Each run loads the
//! config and catalog, loads (or creates) the sandbox character, applies one
//! command, logs the resulting progression events and saves.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod report;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use config::{SandboxConfig, CONFIG_FILE};
use session::Session;

/// Character progression sandbox
#[derive(Parser)]
#[command(name = "ascend")]
#[command(about = "Exercise character progression from the command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("ascend=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("Ascend sandbox {}", env!("CARGO_PKG_VERSION"));

    if cli.command == Command::Init {
        return commands::init_config(&cli.config);
    }

    let config = SandboxConfig::load_from(&cli.config);
    let session = Session::open(config)?;
    commands::run(&cli.command, &session, &mut std::io::stdout().lock())
}
