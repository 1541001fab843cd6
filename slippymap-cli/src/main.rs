//! Slippymap CLI - Command-line interface
//!
//! Inspect the projection, fetch the tiles of a viewport and manage the
//! settings file and disk cache from the shell.

mod commands;
mod error;

use std::process;

use clap::{Parser, Subcommand};
use slippymap::config::ConfigFile;
use slippymap::logging::{init_logging, LoggingGuard};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::{fetch, locate, zoom};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "slippymap", version, about = "Web-Mercator tile engine")]
struct Cli {
    /// Log level or filter directive, overriding logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show where a coordinate lands on the tile grid
    Locate(locate::LocateArgs),

    /// Load the tiles around a coordinate and save them as PNG
    Fetch(fetch::FetchArgs),

    /// Zoom from one scale to another and report the transition
    Zoom(zoom::ZoomArgs),

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the disk tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {} (using defaults)", e);
            ConfigFile::default()
        }
    };

    let _guard = setup_logging(cli.log_level.as_deref(), &config);

    if let Err(e) = run(cli.command, config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(level: Option<&str>, config: &ConfigFile) -> Option<LoggingGuard> {
    let level = level.unwrap_or(&config.logging.level);
    match init_logging(level, config.logging.file.as_deref()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    }
}

fn run(command: Commands, config: ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Locate(args) => locate::run(args, &config),
        Commands::Fetch(args) => fetch::run(args, &config),
        Commands::Zoom(args) => zoom::run(args, &config),
        Commands::Config { command } => commands::config::run(command),
        Commands::Cache { action } => commands::cache::run(action, &config),
    }
}
