//! In-memory upstream nodes and keystore for testing.
//!
//! Both mock nodes count calls per method and can be told to fail any method.
//! Queries for data that was never seeded fail like a real node would.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock as StdRwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Actor, Address, BitField, Cid, Claim, Deadline, DeadlineInfo, Decl, FsStat, KeyInfo,
    LockedFunds, MinerInfo, MinerPower, Partition, SectorId, SectorInfo, SectorNumber, StorageId,
    TipSet, TipSetKey, TokenAmount, WorkerId, WorkerJob, WorkerStats,
};
use crate::domain::ports::{Keystore, MinerApi, NodeApi};

#[derive(Default)]
struct CallLog {
    calls: RwLock<HashMap<&'static str, usize>>,
    failing: RwLock<HashSet<String>>,
}

impl CallLog {
    /// Count the call and return the injected failure, if any.
    async fn enter(&self, method: &'static str) -> DomainResult<()> {
        *self.calls.write().await.entry(method).or_insert(0) += 1;
        if self.failing.read().await.contains(method) {
            return Err(DomainError::upstream(method, "injected failure"));
        }
        Ok(())
    }

    async fn count(&self, method: &str) -> usize {
        self.calls.read().await.get(method).copied().unwrap_or(0)
    }

    async fn total(&self) -> usize {
        self.calls.read().await.values().sum()
    }
}

fn missing(method: &str, what: impl std::fmt::Display) -> DomainError {
    DomainError::upstream(method, format!("{what} not found"))
}

#[derive(Default)]
struct NodeState {
    height: i64,
    miner_infos: HashMap<Address, MinerInfo>,
    actors: HashMap<Address, Actor>,
    powers: HashMap<Address, MinerPower>,
    proving_deadlines: HashMap<Address, DeadlineInfo>,
    partitions: HashMap<Address, Vec<Vec<Partition>>>,
    locked_funds: HashMap<Address, LockedFunds>,
    balances: HashMap<Address, TokenAmount>,
}

/// Mock full node.
#[derive(Default)]
pub struct MockNodeApi {
    state: RwLock<NodeState>,
    log: CallLog,
}

impl MockNodeApi {
    /// Node with an empty chain at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made to `method` (node method name, e.g. `StateGetActor`).
    pub async fn calls(&self, method: &str) -> usize {
        self.log.count(method).await
    }

    /// Calls across every method.
    pub async fn total_calls(&self) -> usize {
        self.log.total().await
    }

    /// Make every later call to `method` fail.
    pub async fn fail(&self, method: &str) {
        self.log.failing.write().await.insert(method.to_string());
    }

    /// Undo [`Self::fail`] for `method`.
    pub async fn recover(&self, method: &str) {
        self.log.failing.write().await.remove(method);
    }

    /// Set the chain head height.
    pub async fn set_height(&self, height: i64) {
        self.state.write().await.height = height;
    }

    /// Miner info returned for `addr`.
    pub async fn set_miner_info(&self, addr: &Address, info: MinerInfo) {
        self.state
            .write()
            .await
            .miner_infos
            .insert(addr.clone(), info);
    }

    /// Miner actor record of `addr` holding `balance`.
    pub async fn set_actor_balance(&self, addr: &Address, balance: TokenAmount) {
        let actor = Actor {
            code: Cid::new("bafkqaetgnfwc6mjpon2g64tbm5sw22lomvza"),
            head: Cid::new("bafy2bzacemockhead"),
            nonce: 0,
            balance,
        };
        self.state.write().await.actors.insert(addr.clone(), actor);
    }

    /// Power claim returned for `addr`.
    pub async fn set_power(&self, addr: &Address, power: MinerPower) {
        self.state.write().await.powers.insert(addr.clone(), power);
    }

    /// Deadline descriptor returned for `addr`.
    pub async fn set_proving_deadline(&self, addr: &Address, info: DeadlineInfo) {
        self.state
            .write()
            .await
            .proving_deadlines
            .insert(addr.clone(), info);
    }

    /// Partitions per deadline, indexed by deadline.
    pub async fn set_partitions(&self, addr: &Address, deadlines: Vec<Vec<Partition>>) {
        self.state
            .write()
            .await
            .partitions
            .insert(addr.clone(), deadlines);
    }

    /// Locked funds returned for `addr`.
    pub async fn set_locked_funds(&self, addr: &Address, funds: LockedFunds) {
        self.state
            .write()
            .await
            .locked_funds
            .insert(addr.clone(), funds);
    }

    /// Wallet balance of `addr`.
    pub async fn set_balance(&self, addr: &Address, balance: TokenAmount) {
        self.state
            .write()
            .await
            .balances
            .insert(addr.clone(), balance);
    }

    /// Seed a complete miner: info, actor, power, one proving deadline with
    /// a single partition of `live` sectors, locked funds and role balances.
    pub async fn seed_miner(&self, addr: &Address, owner: &Address, worker: &Address, live: u64) {
        self.set_miner_info(
            addr,
            MinerInfo {
                owner: owner.clone(),
                worker: worker.clone(),
                control_addresses: Vec::new(),
                peer_id: None,
                sector_size: 34_359_738_368,
                window_po_st_partition_sectors: 2_349,
            },
        )
        .await;
        self.set_actor_balance(addr, TokenAmount::from_fil(100))
            .await;
        self.set_power(
            addr,
            MinerPower {
                miner_power: Claim {
                    raw_byte_power: TokenAmount::from_atto(1_u64 << 40),
                    quality_adj_power: TokenAmount::from_atto(1_u64 << 40),
                },
                total_power: Claim::default(),
                has_min_power: true,
            },
        )
        .await;
        self.set_proving_deadline(addr, deadline_info(1_000, 0))
            .await;
        self.set_partitions(addr, vec![vec![partition(live, 0, 0)]])
            .await;
        self.set_locked_funds(
            addr,
            LockedFunds {
                vesting_funds: TokenAmount::from_fil(10),
                initial_pledge_requirement: TokenAmount::from_fil(20),
                pre_commit_deposits: TokenAmount::from_fil(5),
                fee_debt: TokenAmount::zero(),
            },
        )
        .await;
        self.set_balance(owner, TokenAmount::from_fil(3)).await;
        self.set_balance(worker, TokenAmount::from_fil(2)).await;
    }
}

/// Deadline descriptor with the standard 2880-epoch proving period and 60-epoch windows.
pub fn deadline_info(current_epoch: i64, index: u64) -> DeadlineInfo {
    let period_start = current_epoch - current_epoch % 2_880;
    #[allow(clippy::cast_possible_wrap)]
    let open = period_start + index as i64 * 60;
    DeadlineInfo {
        current_epoch,
        period_start,
        index,
        open,
        close: open + 60,
        challenge: open - 20,
        fault_cutoff: open - 70,
        wpost_period_deadlines: 48,
        wpost_proving_period: 2_880,
    }
}

/// Partition with the given live, faulty and recovering counts.
pub fn partition(live: u64, faulty: u64, recovering: u64) -> Partition {
    Partition {
        all_sectors: BitField::with_count(live),
        faulty_sectors: BitField::with_count(faulty),
        recovering_sectors: BitField::with_count(recovering),
        live_sectors: BitField::with_count(live),
        active_sectors: BitField::with_count(live.saturating_sub(faulty)),
    }
}

#[async_trait]
impl NodeApi for MockNodeApi {
    async fn chain_head(&self) -> DomainResult<TipSet> {
        self.log.enter("ChainHead").await?;
        let height = self.state.read().await.height;
        Ok(TipSet {
            cids: vec![Cid::new(format!("bafy2bzacehead{height}"))],
            height,
        })
    }

    async fn state_get_actor(&self, addr: &Address, _tsk: &TipSetKey) -> DomainResult<Actor> {
        self.log.enter("StateGetActor").await?;
        self.state
            .read()
            .await
            .actors
            .get(addr)
            .cloned()
            .ok_or_else(|| missing("StateGetActor", format!("actor {addr}")))
    }

    async fn state_miner_info(&self, addr: &Address, _tsk: &TipSetKey) -> DomainResult<MinerInfo> {
        self.log.enter("StateMinerInfo").await?;
        self.state
            .read()
            .await
            .miner_infos
            .get(addr)
            .cloned()
            .ok_or_else(|| missing("StateMinerInfo", format!("miner {addr}")))
    }

    async fn state_miner_power(
        &self,
        addr: &Address,
        _tsk: &TipSetKey,
    ) -> DomainResult<MinerPower> {
        self.log.enter("StateMinerPower").await?;
        self.state
            .read()
            .await
            .powers
            .get(addr)
            .cloned()
            .ok_or_else(|| missing("StateMinerPower", format!("power of {addr}")))
    }

    async fn state_miner_proving_deadline(
        &self,
        addr: &Address,
        _tsk: &TipSetKey,
    ) -> DomainResult<DeadlineInfo> {
        self.log.enter("StateMinerProvingDeadline").await?;
        self.state
            .read()
            .await
            .proving_deadlines
            .get(addr)
            .cloned()
            .ok_or_else(|| missing("StateMinerProvingDeadline", format!("deadline of {addr}")))
    }

    async fn state_miner_deadlines(
        &self,
        addr: &Address,
        _tsk: &TipSetKey,
    ) -> DomainResult<Vec<Deadline>> {
        self.log.enter("StateMinerDeadlines").await?;
        let state = self.state.read().await;
        let deadlines = state
            .partitions
            .get(addr)
            .ok_or_else(|| missing("StateMinerDeadlines", format!("deadlines of {addr}")))?;
        Ok(vec![Deadline::default(); deadlines.len()])
    }

    async fn state_miner_partitions(
        &self,
        addr: &Address,
        deadline_index: u64,
        _tsk: &TipSetKey,
    ) -> DomainResult<Vec<Partition>> {
        self.log.enter("StateMinerPartitions").await?;
        let state = self.state.read().await;
        usize::try_from(deadline_index)
            .ok()
            .and_then(|idx| state.partitions.get(addr)?.get(idx).cloned())
            .ok_or_else(|| {
                missing(
                    "StateMinerPartitions",
                    format!("deadline {deadline_index} of {addr}"),
                )
            })
    }

    async fn state_miner_locked_funds(
        &self,
        addr: &Address,
        _tsk: &TipSetKey,
    ) -> DomainResult<LockedFunds> {
        self.log.enter("StateReadState").await?;
        self.state
            .read()
            .await
            .locked_funds
            .get(addr)
            .cloned()
            .ok_or_else(|| missing("StateReadState", format!("state of {addr}")))
    }

    async fn wallet_balance(&self, addr: &Address) -> DomainResult<TokenAmount> {
        self.log.enter("WalletBalance").await?;
        Ok(self
            .state
            .read()
            .await
            .balances
            .get(addr)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct MinerState {
    actor: Option<Address>,
    sectors: BTreeMap<SectorNumber, SectorInfo>,
    worker_stats: BTreeMap<WorkerId, WorkerStats>,
    worker_jobs: BTreeMap<WorkerId, Vec<WorkerJob>>,
    storage: BTreeMap<StorageId, Vec<Decl>>,
    storage_stats: HashMap<StorageId, FsStat>,
}

/// Mock storage-miner node.
#[derive(Default)]
pub struct MockMinerApi {
    state: RwLock<MinerState>,
    log: CallLog,
}

impl MockMinerApi {
    /// Miner node with no sectors, workers or storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made to `method`.
    pub async fn calls(&self, method: &str) -> usize {
        self.log.count(method).await
    }

    /// Calls across every method.
    pub async fn total_calls(&self) -> usize {
        self.log.total().await
    }

    /// Make every later call to `method` fail.
    pub async fn fail(&self, method: &str) {
        self.log.failing.write().await.insert(method.to_string());
    }

    /// Undo [`Self::fail`] for `method`.
    pub async fn recover(&self, method: &str) {
        self.log.failing.write().await.remove(method);
    }

    /// Actor address the node reports.
    pub async fn set_actor(&self, addr: &Address) {
        self.state.write().await.actor = Some(addr.clone());
    }

    /// Add a sector in `state`.
    pub async fn add_sector(&self, number: SectorNumber, state: &str) {
        self.state
            .write()
            .await
            .sectors
            .insert(number, SectorInfo::new(number, state));
    }

    /// Add a worker with its stats.
    pub async fn add_worker(&self, id: &str, hostname: &str, enabled: bool) {
        self.state
            .write()
            .await
            .worker_stats
            .insert(id.to_string(), WorkerStats::new(hostname, enabled));
    }

    /// Queue a job for `worker`, started at the Unix epoch.
    pub async fn add_job(&self, worker: &str, sector: SectorNumber, task: &str, run_wait: i32) {
        let job = WorkerJob {
            sector: SectorId {
                miner: 1_000,
                number: sector,
            },
            task: task.to_string(),
            run_wait,
            start: DateTime::<Utc>::UNIX_EPOCH,
            hostname: None,
        };
        self.state
            .write()
            .await
            .worker_jobs
            .entry(worker.to_string())
            .or_default()
            .push(job);
    }

    /// Register a storage path; `stat` of `None` makes its stat call fail.
    pub async fn add_storage(&self, id: &str, decls: Vec<Decl>, stat: Option<FsStat>) {
        let mut state = self.state.write().await;
        state.storage.insert(id.to_string(), decls);
        if let Some(stat) = stat {
            state.storage_stats.insert(id.to_string(), stat);
        }
    }
}

#[async_trait]
impl MinerApi for MockMinerApi {
    async fn actor_address(&self) -> DomainResult<Address> {
        self.log.enter("ActorAddress").await?;
        self.state
            .read()
            .await
            .actor
            .clone()
            .ok_or_else(|| missing("ActorAddress", "actor address"))
    }

    async fn sectors_list(&self) -> DomainResult<Vec<SectorNumber>> {
        self.log.enter("SectorsList").await?;
        Ok(self.state.read().await.sectors.keys().copied().collect())
    }

    async fn sectors_status(
        &self,
        sector: SectorNumber,
        _show_on_chain_info: bool,
    ) -> DomainResult<SectorInfo> {
        self.log.enter("SectorsStatus").await?;
        self.state
            .read()
            .await
            .sectors
            .get(&sector)
            .cloned()
            .ok_or_else(|| missing("SectorsStatus", format!("sector {sector}")))
    }

    async fn worker_stats(&self) -> DomainResult<BTreeMap<WorkerId, WorkerStats>> {
        self.log.enter("WorkerStats").await?;
        Ok(self.state.read().await.worker_stats.clone())
    }

    async fn worker_jobs(&self) -> DomainResult<BTreeMap<WorkerId, Vec<WorkerJob>>> {
        self.log.enter("WorkerJobs").await?;
        Ok(self.state.read().await.worker_jobs.clone())
    }

    async fn storage_list(&self) -> DomainResult<BTreeMap<StorageId, Vec<Decl>>> {
        self.log.enter("StorageList").await?;
        Ok(self.state.read().await.storage.clone())
    }

    async fn storage_stat(&self, id: &str) -> DomainResult<FsStat> {
        self.log.enter("StorageStat").await?;
        self.state
            .read()
            .await
            .storage_stats
            .get(id)
            .copied()
            .ok_or_else(|| missing("StorageStat", format!("storage {id}")))
    }
}

/// Keystore held in memory.
#[derive(Default)]
pub struct MemoryKeystore {
    keys: StdRwLock<HashMap<String, KeyInfo>>,
}

impl Keystore for MemoryKeystore {
    fn get(&self, name: &str) -> DomainResult<Option<KeyInfo>> {
        let keys = self
            .keys
            .read()
            .map_err(|e| DomainError::Keystore(e.to_string()))?;
        Ok(keys.get(name).cloned())
    }

    fn put(&self, name: &str, info: &KeyInfo) -> DomainResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|e| DomainError::Keystore(e.to_string()))?;
        keys.insert(name.to_string(), info.clone());
        Ok(())
    }
}
