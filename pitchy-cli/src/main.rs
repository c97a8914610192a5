//! pitchy - live pitch monitor and recorder
//!
//! Subcommands:
//! - `pitchy devices` - List audio input devices
//! - `pitchy listen` - Print detected pitch as JSON lines
//! - `pitchy record <id>` - Record to `<recordings_dir>/<id>.wav`
//! - `pitchy config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "pitchy")]
#[command(about = "Live pitch detection and WAV capture")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config_dir>/pitchy/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio input devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print detected pitch as JSON lines
    Listen {
        /// Input device index (overrides the config)
        #[arg(short, long)]
        device: Option<usize>,

        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Record the session to a WAV file
    Record {
        /// Recording name (file is <id>.wav)
        id: String,

        /// Input device index (overrides the config)
        #[arg(short, long)]
        device: Option<usize>,

        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,

        /// Also save a 16kHz slice every N seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        slice_every: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Only print the config file location
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Devices { json } = cli.command {
        return commands::devices(json);
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => pitchy_paths::get_config_file_path()?,
    };
    let config = CliConfig::load(&config_path)?;
    info!("Configuration loaded from {}", config.config_path.display());

    match cli.command {
        Commands::Devices { .. } => Ok(()),
        Commands::Listen { device, seconds } => commands::listen(&config, device, seconds).await,
        Commands::Record {
            id,
            device,
            seconds,
            slice_every,
        } => commands::record(&config, &id, device, seconds, slice_every).await,
        Commands::Config { path } => commands::show_config(&config, path),
    }
}
