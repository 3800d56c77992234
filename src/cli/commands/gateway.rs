//! `gateway run`: serve the cached JSON-RPC gateway.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{build_engine, shutdown_on_ctrl_c, wait_for_shutdown};
use crate::adapters::rpc::{RpcServer, RpcServerConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::keystore::{write_token, FileKeystore};
use crate::infrastructure::lotus_repo::expand_tilde;
use crate::services::{AuthGate, CachedGateway, TtlCache};

/// Arguments of `lotus-adapter gateway`.
#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Action to run.
    #[command(subcommand)]
    pub command: GatewayCommand,
}

/// Gateway actions.
#[derive(Subcommand, Debug)]
pub enum GatewayCommand {
    /// Start the gateway and serve until Ctrl-C
    Run {
        /// Listen address (overrides gateway.listen)
        #[arg(long)]
        listen: Option<String>,

        /// Cache entry time-to-live in seconds (overrides cache.default_ttl_secs)
        #[arg(long)]
        expiration: Option<u64>,

        /// Cache sweep interval in seconds (overrides cache.sweep_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, Serialize)]
struct GatewayStopped {
    listen: String,
    cached_entries: u64,
}

impl CommandOutput for GatewayStopped {
    fn to_human(&self) -> String {
        format!(
            "Gateway on {} stopped ({} cached entries dropped)",
            self.listen, self.cached_entries
        )
    }
}

/// Run a `gateway` subcommand.
pub async fn execute(args: GatewayArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        GatewayCommand::Run {
            listen,
            expiration,
            interval,
        } => {
            let mut config = config.clone();
            if let Some(listen) = listen {
                config.gateway.listen = listen;
            }
            if let Some(secs) = expiration {
                config.cache.default_ttl_secs = secs;
            }
            if let Some(secs) = interval {
                config.cache.sweep_interval_secs = secs;
            }
            ConfigLoader::validate(&config)?;
            run_gateway(&config, json_mode).await
        }
    }
}

async fn run_gateway(config: &Config, json_mode: bool) -> Result<()> {
    let engine = build_engine(config)?;

    let repo = expand_tilde(&config.gateway.repo);
    fs::create_dir_all(&repo)
        .with_context(|| format!("Failed to create gateway repo {}", repo.display()))?;
    let keystore = FileKeystore::open(&repo)?;
    let (auth, admin_token) = AuthGate::load_or_generate(&keystore)?;
    if let Some(token) = admin_token {
        let path = write_token(&repo, &token)?;
        info!(path = %path.display(), "wrote admin token");
    }

    let shutdown = shutdown_on_ctrl_c();
    let cache: TtlCache<Value> = TtlCache::new(Duration::from_secs(config.cache.default_ttl_secs));
    let sweeper = cache.spawn_sweeper(
        Duration::from_secs(config.cache.sweep_interval_secs),
        shutdown.clone(),
    );
    let gateway = CachedGateway::new(
        engine,
        cache.clone(),
        Duration::from_secs(config.cache.worker_ttl_secs),
    );

    let server = RpcServer::new(
        gateway,
        Arc::new(auth),
        RpcServerConfig {
            listen: config.gateway.listen.clone(),
            request_timeout: Duration::from_secs(config.gateway.request_timeout_secs),
            enable_cors: config.gateway.enable_cors,
        },
    );
    info!(
        ttl_secs = config.cache.default_ttl_secs,
        sweep_secs = config.cache.sweep_interval_secs,
        worker_ttl_secs = config.cache.worker_ttl_secs,
        "starting gateway"
    );

    server
        .serve_with_shutdown(wait_for_shutdown(shutdown))
        .await
        .map_err(|e| anyhow!("gateway server failed: {e}"))?;
    sweeper.await.context("cache sweeper panicked")?;

    output(
        &GatewayStopped {
            listen: config.gateway.listen.clone(),
            cached_entries: cache.entry_count(),
        },
        json_mode,
    );
    Ok(())
}
