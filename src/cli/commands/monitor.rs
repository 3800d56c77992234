//! `monitor`: push miner snapshots to the collector.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use super::{build_engine, build_miner_engines, shutdown_on_ctrl_c, tracked_miners};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{DaemonStatus, Processor, PushDaemon, PushDaemonConfig};

/// Arguments of `lotus-adapter monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Action to run.
    #[command(subcommand)]
    pub command: MonitorCommand,

    /// Collector URL (overrides monitor.collector_url)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Extra request header as NAME=VALUE; repeatable
    #[arg(long = "header", global = true, value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

/// Push actions.
#[derive(Subcommand, Debug)]
pub enum MonitorCommand {
    /// Push on an interval until Ctrl-C
    Run {
        /// Seconds between pushes (overrides monitor.interval_secs)
        #[arg(long)]
        interval: Option<u64>,

        /// Push once immediately instead of after the first interval
        #[arg(long)]
        now: bool,
    },
    /// Run a single push cycle
    Tick,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Serialize)]
struct TickOutput {
    collector_url: String,
    pushed: usize,
}

impl CommandOutput for TickOutput {
    fn to_human(&self) -> String {
        if self.pushed == 0 {
            "No miners tracked; nothing pushed".to_string()
        } else {
            format!("Pushed {} miner(s) to {}", self.pushed, self.collector_url)
        }
    }
}

#[derive(Debug, Serialize)]
struct RunOutput {
    total_runs: u64,
    successful_runs: u64,
    failed_runs: u64,
    last_error: Option<String>,
}

impl From<DaemonStatus> for RunOutput {
    fn from(status: DaemonStatus) -> Self {
        Self {
            total_runs: status.total_runs,
            successful_runs: status.successful_runs,
            failed_runs: status.failed_runs,
            last_error: status.last_error,
        }
    }
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut out = format!(
            "Monitor stopped after {} run(s): {} succeeded, {} failed",
            self.total_runs, self.successful_runs, self.failed_runs
        );
        if let Some(ref err) = self.last_error {
            out.push_str(&format!("\nLast error: {err}"));
        }
        out
    }
}

/// Run a `monitor` subcommand.
pub async fn execute(args: MonitorArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(proxy) = args.proxy {
        config.monitor.collector_url = proxy;
    }
    config.monitor.headers.extend(args.headers);

    match args.command {
        MonitorCommand::Run { interval, now } => {
            if let Some(secs) = interval {
                config.monitor.interval_secs = secs;
            }
            config.monitor.run_on_startup |= now;
            ConfigLoader::validate(&config)?;
            ConfigLoader::validate_monitor(&config)?;

            let processor = build_processor(&config).await?;
            let daemon = PushDaemon::new(
                Arc::new(processor),
                PushDaemonConfig {
                    interval: Duration::from_secs(config.monitor.interval_secs),
                    run_on_startup: config.monitor.run_on_startup,
                },
            );
            let status = daemon.run(shutdown_on_ctrl_c()).await;
            output(&RunOutput::from(status), json_mode);
            Ok(())
        }
        MonitorCommand::Tick => {
            ConfigLoader::validate(&config)?;
            ConfigLoader::validate_monitor(&config)?;
            let processor = build_processor(&config).await?;
            let pushed = processor.push_all().await?;
            output(
                &TickOutput {
                    collector_url: processor.collector_url().to_string(),
                    pushed,
                },
                json_mode,
            );
            Ok(())
        }
    }
}

async fn build_processor(config: &Config) -> Result<Processor> {
    let engine = build_engine(config)?;
    let miner_engines = build_miner_engines(config, &engine)?;
    let miners = tracked_miners(&config.monitor.miners, &engine, &miner_engines).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.monitor.timeout_secs))
        .build()
        .context("Failed to build collector HTTP client")?;

    Ok(Processor::new(
        miners,
        client,
        config.monitor.collector_url.clone(),
        config.monitor.headers.clone(),
    ))
}
