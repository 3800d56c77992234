//! CLI command implementations.

pub mod auth;
pub mod gateway;
pub mod monitor;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::lotus::{LotusMinerClient, LotusNodeClient};
use crate::domain::models::{Address, Config, UpstreamConfig};
use crate::domain::ports::MinerApi;
use crate::infrastructure::lotus_repo::resolve_endpoint;
use crate::services::AggregationEngine;

fn connect_miner(upstream: &UpstreamConfig) -> Result<Arc<dyn MinerApi>> {
    let (url, token) = resolve_endpoint(upstream).context("Failed to resolve miner endpoint")?;
    info!(miner = %url, "connecting to miner node");
    let miner = LotusMinerClient::new(url, token, Duration::from_secs(upstream.timeout_secs))?;
    Ok(Arc::new(miner))
}

/// Connect to the configured node and miner and bind them to one engine.
pub(crate) fn build_engine(config: &Config) -> Result<Arc<AggregationEngine>> {
    let (node_url, node_token) =
        resolve_endpoint(&config.node).context("Failed to resolve full node endpoint")?;
    info!(node = %node_url, "connecting to full node");
    let node = LotusNodeClient::new(
        node_url,
        node_token,
        Duration::from_secs(config.node.timeout_secs),
    )?;

    Ok(Arc::new(AggregationEngine::new(
        Arc::new(node),
        connect_miner(&config.miner)?,
        config.chain.block_delay_secs,
    )))
}

/// One engine per `monitor.miner_nodes` entry, sharing the full node of `engine`.
pub(crate) fn build_miner_engines(
    config: &Config,
    engine: &Arc<AggregationEngine>,
) -> Result<BTreeMap<Address, Arc<AggregationEngine>>> {
    config
        .monitor
        .miner_nodes
        .iter()
        .map(|(miner, upstream)| {
            let addr = miner.parse::<Address>().map_err(anyhow::Error::msg)?;
            let bound = AggregationEngine::new(
                engine.node().clone(),
                connect_miner(upstream).with_context(|| format!("miner node of {addr}"))?,
                config.chain.block_delay_secs,
            );
            Ok((addr, Arc::new(bound)))
        })
        .collect()
}

/// Bind every tracked miner to the engine whose miner node serves it.
///
/// Tracked miners are `miners` plus the keys of `miner_engines`; with neither,
/// the default miner node's own actor. A miner without its own entry must be
/// the actor of the default miner node, since sector, worker and storage
/// views come from the node and not from the chain.
pub(crate) async fn tracked_miners(
    miners: &[String],
    engine: &Arc<AggregationEngine>,
    miner_engines: &BTreeMap<Address, Arc<AggregationEngine>>,
) -> Result<BTreeMap<Address, Arc<AggregationEngine>>> {
    let mut addresses = miners
        .iter()
        .map(|m| m.parse::<Address>().map_err(anyhow::Error::msg))
        .collect::<Result<BTreeSet<_>>>()?;
    addresses.extend(miner_engines.keys().cloned());

    if addresses.is_empty() {
        let actor = engine
            .miner()
            .actor_address()
            .await
            .context("Failed to query miner actor address")?;
        return Ok(BTreeMap::from([(actor, engine.clone())]));
    }

    let mut tracked = BTreeMap::new();
    for addr in addresses {
        let bound = miner_engines.get(&addr).unwrap_or(engine);
        let actor = bound
            .miner()
            .actor_address()
            .await
            .with_context(|| format!("Failed to query miner node of {addr}"))?;
        if actor != addr {
            bail!(
                "miner {addr} is not served by its miner node (node reports {actor}); \
                 add a monitor.miner_nodes entry for it"
            );
        }
        tracked.insert(addr, bound.clone());
    }
    Ok(tracked)
}

/// Shutdown channel that flips to `true` on Ctrl-C.
pub(crate) fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                let _ = tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for Ctrl-C; running until killed");
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

/// Resolve once `shutdown` flips to `true` or its sender goes away.
pub(crate) async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
