//! Ensemble Cluster CLI
//!
//! Runs the strategy-free stages of the pipeline over JSON files.
//!
//! # Commands
//!
//! - `consensus`: consensus partition from a precomputed label matrix
//! - `hierarchy`: cluster hierarchy from a feature matrix and a partition
//! - `contrasts`: contrast specifications for a partition
//!
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! # Exit Codes
//! - 0: Success
//! - 1: Invalid input, configuration or I/O failure

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Ensemble Cluster CLI - consensus, hierarchy and contrast stages
#[derive(Parser)]
#[command(name = "ensemble-cluster")]
#[command(version)]
#[command(about = "Consensus clustering, cluster hierarchies and contrast generation over JSON files")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file (defaults to the layered config/ directory
    /// and ENSEMBLE_CLUSTER__* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a consensus partition from a label matrix
    Consensus(commands::consensus::ConsensusArgs),
    /// Build a cluster hierarchy from a feature matrix and a partition
    Hierarchy(commands::hierarchy::HierarchyArgs),
    /// Generate contrasts for a partition
    Contrasts(commands::contrasts::ContrastsArgs),
}

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Consensus(args) => commands::consensus::consensus_command(args, config_path),
        Commands::Hierarchy(args) => commands::hierarchy::hierarchy_command(args, config_path),
        Commands::Contrasts(args) => commands::contrasts::contrasts_command(args, config_path),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
