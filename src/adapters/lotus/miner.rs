//! Storage-miner client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::rpc_client::{param, LotusRpcClient};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Address, Decl, FsStat, SectorInfo, SectorNumber, StorageId, WorkerId, WorkerJob, WorkerStats,
};
use crate::domain::ports::MinerApi;

/// [`MinerApi`] over a Lotus storage miner's JSON-RPC endpoint.
pub struct LotusMinerClient {
    rpc: LotusRpcClient,
}

impl LotusMinerClient {
    /// Connect to the endpoint at `url`, sending `token` as a bearer token.
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> DomainResult<Self> {
        Ok(Self {
            rpc: LotusRpcClient::new(url, token, timeout)?,
        })
    }

    /// Endpoint this client posts to.
    pub fn url(&self) -> &str {
        self.rpc.url()
    }
}

#[async_trait]
impl MinerApi for LotusMinerClient {
    async fn actor_address(&self) -> DomainResult<Address> {
        self.rpc.call("ActorAddress", vec![]).await
    }

    async fn sectors_list(&self) -> DomainResult<Vec<SectorNumber>> {
        self.rpc.call_or_default("SectorsList", vec![]).await
    }

    async fn sectors_status(
        &self,
        sector: SectorNumber,
        show_on_chain_info: bool,
    ) -> DomainResult<SectorInfo> {
        self.rpc
            .call(
                "SectorsStatus",
                vec![param(sector)?, param(show_on_chain_info)?],
            )
            .await
    }

    async fn worker_stats(&self) -> DomainResult<BTreeMap<WorkerId, WorkerStats>> {
        self.rpc.call_or_default("WorkerStats", vec![]).await
    }

    async fn worker_jobs(&self) -> DomainResult<BTreeMap<WorkerId, Vec<WorkerJob>>> {
        self.rpc.call_or_default("WorkerJobs", vec![]).await
    }

    async fn storage_list(&self) -> DomainResult<BTreeMap<StorageId, Vec<Decl>>> {
        self.rpc.call_or_default("StorageList", vec![]).await
    }

    async fn storage_stat(&self, id: &str) -> DomainResult<FsStat> {
        self.rpc.call("StorageStat", vec![param(id)?]).await
    }
}
