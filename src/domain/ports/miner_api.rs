//! Storage-miner port - sector, worker and storage queries.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Address, Decl, FsStat, SectorInfo, SectorNumber, StorageId, WorkerId, WorkerJob, WorkerStats,
};

/// Operations capability of a storage-miner node.
///
/// Maps are ordered by key so everything built from them is deterministic.
#[async_trait]
pub trait MinerApi: Send + Sync {
    /// Miner actor the node operates.
    async fn actor_address(&self) -> DomainResult<Address>;

    /// Every sector number the node knows.
    async fn sectors_list(&self) -> DomainResult<Vec<SectorNumber>>;

    /// State of one sector; `show_on_chain_info` adds chain data.
    async fn sectors_status(
        &self,
        sector: SectorNumber,
        show_on_chain_info: bool,
    ) -> DomainResult<SectorInfo>;

    /// Registered workers and their resources.
    async fn worker_stats(&self) -> DomainResult<BTreeMap<WorkerId, WorkerStats>>;

    /// Running and queued jobs per worker.
    async fn worker_jobs(&self) -> DomainResult<BTreeMap<WorkerId, Vec<WorkerJob>>>;

    /// Sector files declared on each storage path.
    async fn storage_list(&self) -> DomainResult<BTreeMap<StorageId, Vec<Decl>>>;

    /// Filesystem usage of storage path `id`.
    async fn storage_stat(&self, id: &str) -> DomainResult<FsStat>;
}
