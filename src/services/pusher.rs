//! Periodic snapshot push to the monitoring collector.
//!
//! A [`Processor`] aggregates every tracked miner and posts the batch in one
//! request. [`PushDaemon`] runs it on an interval until shutdown. A failed
//! cycle is logged and counted; the next tick starts from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Address, PushedMinerInfo};
use crate::services::aggregation::AggregationEngine;

/// Aggregates tracked miners and posts them to the collector.
pub struct Processor {
    miners: BTreeMap<Address, Arc<AggregationEngine>>,
    client: reqwest::Client,
    collector_url: String,
    headers: BTreeMap<String, String>,
}

impl Processor {
    /// Processor pushing `miners` to `collector_url` with `headers`.
    pub fn new(
        miners: BTreeMap<Address, Arc<AggregationEngine>>,
        client: reqwest::Client,
        collector_url: impl Into<String>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            miners,
            client,
            collector_url: collector_url.into(),
            headers,
        }
    }

    /// Tracked miners in push order.
    pub fn tracked(&self) -> impl Iterator<Item = &Address> {
        self.miners.keys()
    }

    /// Where batches are posted.
    pub fn collector_url(&self) -> &str {
        &self.collector_url
    }

    /// Aggregate every tracked miner in address order. Stops at the first failure.
    pub async fn collect(&self) -> DomainResult<Vec<PushedMinerInfo>> {
        let mut batch = Vec::with_capacity(self.miners.len());
        for (addr, engine) in &self.miners {
            batch.push(engine.snapshot(addr).await?);
        }
        Ok(batch)
    }

    /// Run one push cycle and return the number of miners pushed.
    ///
    /// Nothing is posted when no miner is tracked or any aggregation fails.
    #[instrument(skip(self), fields(url = %self.collector_url))]
    pub async fn push_all(&self) -> DomainResult<usize> {
        let batch = self.collect().await?;
        if batch.is_empty() {
            debug!("no tracked miners, skipping push");
            return Ok(0);
        }
        self.post(&batch).await?;
        Ok(batch.len())
    }

    async fn post(&self, batch: &[PushedMinerInfo]) -> DomainResult<()> {
        let mut request = self.client.post(&self.collector_url).json(batch);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| DomainError::PushFailed {
            url: self.collector_url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DomainError::PushRejected {
            url: self.collector_url.clone(),
            status: status.as_u16(),
            body,
        })
    }
}

/// Configuration for the push daemon.
#[derive(Debug, Clone)]
pub struct PushDaemonConfig {
    /// Interval between push cycles.
    pub interval: Duration,
    /// Whether to push once immediately on start.
    pub run_on_startup: bool,
}

impl Default for PushDaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            run_on_startup: false,
        }
    }
}

/// Status of the push daemon.
#[derive(Debug, Clone, Default)]
pub struct DaemonStatus {
    /// Whether the daemon loop is running.
    pub running: bool,
    /// Total push cycles started.
    pub total_runs: u64,
    /// Cycles that delivered a batch (or had nothing to deliver).
    pub successful_runs: u64,
    /// Cycles that failed during aggregation or delivery.
    pub failed_runs: u64,
    /// When the last cycle finished.
    pub last_run: Option<Instant>,
    /// Miners in the last delivered batch.
    pub last_batch_size: usize,
    /// Error of the most recent failed cycle.
    pub last_error: Option<String>,
}

/// Read-only view of a running daemon.
#[derive(Clone)]
pub struct DaemonHandle {
    status: Arc<RwLock<DaemonStatus>>,
}

impl DaemonHandle {
    /// Snapshot of the daemon status.
    pub async fn status(&self) -> DaemonStatus {
        self.status.read().await.clone()
    }
}

/// Pushes snapshots on a fixed interval.
pub struct PushDaemon {
    processor: Arc<Processor>,
    config: PushDaemonConfig,
    status: Arc<RwLock<DaemonStatus>>,
}

impl PushDaemon {
    /// Daemon running `processor` on `config.interval`.
    pub fn new(processor: Arc<Processor>, config: PushDaemonConfig) -> Self {
        Self {
            processor,
            config,
            status: Arc::new(RwLock::new(DaemonStatus::default())),
        }
    }

    /// Handle for reading the status while the daemon runs.
    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            status: self.status.clone(),
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A cycle already in progress completes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> DaemonStatus {
        info!(
            interval_secs = self.config.interval.as_secs(),
            miners = self.processor.tracked().count(),
            "push daemon started"
        );
        self.status.write().await.running = true;

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.config.run_on_startup {
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let mut status = self.status.write().await;
        status.running = false;
        info!(
            total_runs = status.total_runs,
            failed_runs = status.failed_runs,
            "push daemon stopped"
        );
        status.clone()
    }

    async fn tick(&self) {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };
        debug!(run_number, "push lotus miner info");

        let result = self.processor.push_all().await;

        let mut status = self.status.write().await;
        status.last_run = Some(Instant::now());
        match result {
            Ok(pushed) => {
                status.successful_runs += 1;
                status.last_batch_size = pushed;
                info!(run_number, pushed, "push cycle complete");
            }
            Err(err) => {
                status.failed_runs += 1;
                status.last_error = Some(err.to_string());
                error!(run_number, error = %err, "push lotus miner info failed");
            }
        }
    }
}
