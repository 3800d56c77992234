//! `snapshot`: aggregate miners once and print the result.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::{build_engine, build_miner_engines, tracked_miners};
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Address, Config, PushedMinerInfo};

/// Arguments of `lotus-adapter snapshot`.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Miner to aggregate; repeatable (defaults to monitor.miners)
    #[arg(short, long)]
    pub miner: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct SnapshotOutput(Vec<PushedMinerInfo>);

impl CommandOutput for SnapshotOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        self.0
            .iter()
            .map(|info| formatter.format_snapshot(info))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Aggregate the selected miners once and print the result.
pub async fn execute(args: SnapshotArgs, config: &Config, json_mode: bool) -> Result<()> {
    let engine = build_engine(config)?;
    let mut miner_engines = build_miner_engines(config, &engine)?;

    let miners = if args.miner.is_empty() {
        config.monitor.miners.clone()
    } else {
        let requested = args
            .miner
            .iter()
            .map(|m| m.parse::<Address>().map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()?;
        miner_engines.retain(|addr, _| requested.contains(addr));
        args.miner
    };
    let tracked = tracked_miners(&miners, &engine, &miner_engines).await?;

    let mut snapshots = Vec::with_capacity(tracked.len());
    for (addr, engine) in &tracked {
        let snapshot = engine
            .snapshot(addr)
            .await
            .with_context(|| format!("Failed to aggregate miner {addr}"))?;
        snapshots.push(snapshot);
    }

    output(&SnapshotOutput(snapshots), json_mode);
    Ok(())
}
