//! Read-only gateway surface with per-call result caching.
//!
//! Every method derives a key from its name and arguments, serves a live
//! cached result if there is one, and otherwise computes, stores and returns
//! it. Failures are returned to the caller and never stored.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Actor, Address, ClusterAssetInfo, MinerInfo, MinerPower, MinerSectorsInfo, ProvingInfo,
    SectorInfo, SectorNumber, StorageInfo, TipSetKey, TokenAmount, WorkerId, WorkerJob,
    WorkerStats, WorkerTaskState,
};
use crate::services::aggregation::AggregationEngine;
use crate::services::ttl_cache::{cache_key, TtlCache};

/// Caching facade over the node, the miner and the aggregation engine.
#[derive(Clone)]
pub struct CachedGateway {
    engine: Arc<AggregationEngine>,
    cache: TtlCache<Value>,
    worker_ttl: Duration,
}

impl CachedGateway {
    /// Serve `engine` through `cache`. Worker job views expire after `worker_ttl`.
    pub fn new(
        engine: Arc<AggregationEngine>,
        cache: TtlCache<Value>,
        worker_ttl: Duration,
    ) -> Self {
        Self {
            engine,
            cache,
            worker_ttl,
        }
    }

    /// Backing cache, for diagnostics.
    pub const fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// Engine computing cache misses.
    pub fn engine(&self) -> &Arc<AggregationEngine> {
        &self.engine
    }

    async fn cached<T, F>(&self, key: String, ttl: Duration, compute: F) -> DomainResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = DomainResult<T>>,
    {
        trace!(%key, "gateway lookup");
        let value = self
            .cache
            .get_or_try_insert(key, ttl, async move {
                Ok(serde_json::to_value(compute.await?)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    fn default_ttl(&self) -> Duration {
        self.cache.default_ttl()
    }

    /// `StateMinerInfo`, keyed by address and tipset.
    pub async fn state_miner_info(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<MinerInfo> {
        let key = cache_key("StateMinerInfo", &[addr.as_str(), tsk.canonical().as_str()]);
        self.cached(
            key,
            self.default_ttl(),
            self.engine.node().state_miner_info(addr, tsk),
        )
        .await
    }

    /// `StateGetActor`, keyed by address and tipset.
    pub async fn state_get_actor(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<Actor> {
        let key = cache_key("StateGetActor", &[addr.as_str(), tsk.canonical().as_str()]);
        self.cached(
            key,
            self.default_ttl(),
            self.engine.node().state_get_actor(addr, tsk),
        )
        .await
    }

    /// `StateMinerPower`, keyed by address and tipset.
    pub async fn state_miner_power(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<MinerPower> {
        let key = cache_key(
            "StateMinerPower",
            &[addr.as_str(), tsk.canonical().as_str()],
        );
        self.cached(
            key,
            self.default_ttl(),
            self.engine.node().state_miner_power(addr, tsk),
        )
        .await
    }

    /// `WalletBalance`, keyed by address.
    pub async fn wallet_balance(&self, addr: &Address) -> DomainResult<TokenAmount> {
        let key = cache_key("WalletBalance", &[addr.as_str()]);
        self.cached(
            key,
            self.default_ttl(),
            self.engine.node().wallet_balance(addr),
        )
        .await
    }

    /// Aggregated balances of a miner. See [`AggregationEngine::asset_info`].
    pub async fn miner_asset_info(&self, addr: &Address) -> DomainResult<ClusterAssetInfo> {
        let key = cache_key("MinerAssetInfo", &[addr.as_str()]);
        self.cached(key, self.default_ttl(), self.engine.asset_info(addr))
            .await
    }

    /// Proving period summary of a miner. See [`AggregationEngine::proving_info`].
    pub async fn miner_proving_info(&self, addr: &Address) -> DomainResult<ProvingInfo> {
        let key = cache_key("MinerProvingInfo", &[addr.as_str()]);
        self.cached(key, self.default_ttl(), self.engine.proving_info(addr))
            .await
    }

    /// Actor address of the miner node.
    pub async fn actor_address(&self) -> DomainResult<Address> {
        let key = cache_key("ActorAddress", &[]);
        self.cached(key, self.default_ttl(), self.engine.miner().actor_address())
            .await
    }

    /// Every sector number on the miner node.
    pub async fn sectors_list(&self) -> DomainResult<Vec<SectorNumber>> {
        let key = cache_key("SectorsList", &[]);
        self.cached(key, self.default_ttl(), self.engine.miner().sectors_list())
            .await
    }

    /// `SectorsStatus`, keyed by sector number and the on-chain info flag.
    pub async fn sectors_status(
        &self,
        sector: SectorNumber,
        show_on_chain_info: bool,
    ) -> DomainResult<SectorInfo> {
        let sector_arg = sector.to_string();
        let show_arg = show_on_chain_info.to_string();
        let key = cache_key("SectorsStatus", &[sector_arg.as_str(), show_arg.as_str()]);
        self.cached(
            key,
            self.default_ttl(),
            self.engine
                .miner()
                .sectors_status(sector, show_on_chain_info),
        )
        .await
    }

    /// Worker hostnames and enabled flags.
    pub async fn worker_stats(&self) -> DomainResult<BTreeMap<WorkerId, WorkerStats>> {
        let key = cache_key("WorkerStats", &[]);
        self.cached(key, self.default_ttl(), self.engine.miner().worker_stats())
            .await
    }

    /// Jobs per worker, held for the short worker TTL.
    pub async fn worker_jobs(&self) -> DomainResult<BTreeMap<WorkerId, Vec<WorkerJob>>> {
        let key = cache_key("WorkerJobs", &[]);
        self.cached(key, self.worker_ttl, self.engine.miner().worker_jobs())
            .await
    }

    /// Total and proving sector counts.
    pub async fn miner_sectors_info(&self) -> DomainResult<MinerSectorsInfo> {
        let key = cache_key("MinerSectorsInfo", &[]);
        self.cached(key, self.default_ttl(), self.engine.sectors_info())
            .await
    }

    /// Workers joined with their tasks, held for the short worker TTL.
    pub async fn worker_task_info(&self) -> DomainResult<Vec<WorkerTaskState>> {
        let key = cache_key("WorkerTaskInfo", &[]);
        self.cached(key, self.worker_ttl, self.engine.worker_task_info())
            .await
    }

    /// Storage paths sorted by capacity. See [`AggregationEngine::storage_info`].
    pub async fn storage_info(&self) -> DomainResult<Vec<StorageInfo>> {
        let key = cache_key("StorageInfo", &[]);
        self.cached(key, self.default_ttl(), self.engine.storage_info())
            .await
    }
}
