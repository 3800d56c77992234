//! Full-node port - read-only chain state queries.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Actor, Address, Deadline, DeadlineInfo, LockedFunds, MinerInfo, MinerPower, Partition, TipSet,
    TipSetKey, TokenAmount,
};

/// Chain-state capability of a full node.
///
/// Every state query takes a tipset key; the empty key means the current head.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Current heaviest tipset.
    async fn chain_head(&self) -> DomainResult<TipSet>;

    /// On-chain actor state of `addr`.
    async fn state_get_actor(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<Actor>;

    /// Owner, worker, control addresses and sector size.
    async fn state_miner_info(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<MinerInfo>;

    /// Miner claim and network totals.
    async fn state_miner_power(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<MinerPower>;

    /// The deadline open at `tsk`.
    async fn state_miner_proving_deadline(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<DeadlineInfo>;

    /// All deadlines of the miner's proving period, in index order.
    async fn state_miner_deadlines(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<Vec<Deadline>>;

    /// Partitions of deadline `deadline_index`.
    async fn state_miner_partitions(
        &self,
        addr: &Address,
        deadline_index: u64,
        tsk: &TipSetKey,
    ) -> DomainResult<Vec<Partition>>;

    /// Vesting, pledge, pre-commit deposits and fee debt held by the miner actor.
    async fn state_miner_locked_funds(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<LockedFunds>;

    /// Balance of `addr` in attoFIL.
    async fn wallet_balance(&self, addr: &Address) -> DomainResult<TokenAmount>;
}
