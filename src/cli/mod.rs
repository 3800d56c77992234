//! Command-line interface.
//!
//! Clap command structures plus the top-level error handler. Each
//! subcommand lives in [`commands`] and exposes an `execute` function.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::auth::AuthArgs;
use commands::gateway::GatewayArgs;
use commands::monitor::MonitorArgs;
use commands::snapshot::SnapshotArgs;

/// Command-line entry point.
#[derive(Parser, Debug)]
#[command(name = "lotus-adapter")]
#[command(about = "Caching, aggregating gateway in front of Lotus nodes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./lotus-adapter.yaml when present)
    #[arg(short, long, global = true, env = "LOTUS_ADAPTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the cached JSON-RPC gateway
    Gateway(GatewayArgs),

    /// Push miner snapshots to a collector
    Monitor(MonitorArgs),

    /// Compute and print miner snapshots without pushing
    Snapshot(SnapshotArgs),

    /// Manage gateway API tokens
    Auth(AuthArgs),
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let output = serde_json::json!({
            "error": format!("{err:#}"),
        });
        println!("{output}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
