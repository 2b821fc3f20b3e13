//! # Skirmish Engine
//!
//! Headless driver for the Skirmish simulation core.
//!
//! Loads `skirmish.toml` (or the file named by `$SKIRMISH_CONFIG`), builds
//! the default arena and plays one run with a scripted autopilot, logging
//! the event stream. Set `RUST_LOG` to see per-frame AI and combat detail,
//! e.g. `RUST_LOG=skirmish_core=debug`.
//!
//! `skirmish --config <path>` reads tuning from `<path>` instead, and
//! `skirmish --write-config <path>` writes the active configuration to
//! `<path>` and exits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod runner;
mod timing;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Headless Skirmish runner
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read configuration from this file instead of `skirmish.toml`
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the active configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

/// Main entry point.
fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    info!("Skirmish starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    config.validate();

    if let Some(path) = &args.write_config {
        config.save_to(path)?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let summary = runner::run(&config)?;
    info!(
        "Run ended (seed {}): {:?} after {} frames ({:.1}s simulated), {} kills, level {}, \
         health {:.1}, {} hostiles left, {} events, {:.3} ms/step",
        summary.seed,
        summary.outcome,
        summary.frames,
        summary.simulated_seconds,
        summary.kills,
        summary.level,
        summary.player_health,
        summary.hostiles_alive,
        summary.events,
        summary.average_step_ms
    );

    info!("Skirmish shutdown complete");
    Ok(())
}
