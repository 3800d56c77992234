//! Full-node client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::rpc_client::{param, LotusRpcClient};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Actor, Address, Deadline, DeadlineInfo, LockedFunds, MinerInfo, MinerPower, Partition, TipSet,
    TipSetKey, TokenAmount,
};
use crate::domain::ports::NodeApi;

/// Miner actor state fields that hold locked funds. Older actor versions
/// name the pledge `InitialPledgeRequirement` and carry no fee debt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MinerActorState {
    locked_funds: TokenAmount,
    #[serde(alias = "InitialPledgeRequirement")]
    initial_pledge: TokenAmount,
    pre_commit_deposits: TokenAmount,
    #[serde(default)]
    fee_debt: TokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ActorState {
    state: MinerActorState,
}

/// [`NodeApi`] over a Lotus full node's JSON-RPC endpoint.
pub struct LotusNodeClient {
    rpc: LotusRpcClient,
}

impl LotusNodeClient {
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
impl NodeApi for LotusNodeClient {
    async fn chain_head(&self) -> DomainResult<TipSet> {
        self.rpc.call("ChainHead", vec![]).await
    }

    async fn state_get_actor(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<Actor> {
        self.rpc
            .call("StateGetActor", vec![param(addr)?, param(tsk)?])
            .await
    }

    async fn state_miner_info(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<MinerInfo> {
        self.rpc
            .call("StateMinerInfo", vec![param(addr)?, param(tsk)?])
            .await
    }

    async fn state_miner_power(&self, addr: &Address, tsk: &TipSetKey) -> DomainResult<MinerPower> {
        self.rpc
            .call("StateMinerPower", vec![param(addr)?, param(tsk)?])
            .await
    }

    async fn state_miner_proving_deadline(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<DeadlineInfo> {
        self.rpc
            .call("StateMinerProvingDeadline", vec![param(addr)?, param(tsk)?])
            .await
    }

    async fn state_miner_deadlines(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<Vec<Deadline>> {
        self.rpc
            .call_or_default("StateMinerDeadlines", vec![param(addr)?, param(tsk)?])
            .await
    }

    async fn state_miner_partitions(
        &self,
        addr: &Address,
        deadline_index: u64,
        tsk: &TipSetKey,
    ) -> DomainResult<Vec<Partition>> {
        self.rpc
            .call_or_default(
                "StateMinerPartitions",
                vec![param(addr)?, param(deadline_index)?, param(tsk)?],
            )
            .await
    }

    async fn state_miner_locked_funds(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
    ) -> DomainResult<LockedFunds> {
        let actor: ActorState = self
            .rpc
            .call("StateReadState", vec![param(addr)?, param(tsk)?])
            .await?;
        Ok(LockedFunds {
            vesting_funds: actor.state.locked_funds,
            initial_pledge_requirement: actor.state.initial_pledge,
            pre_commit_deposits: actor.state.pre_commit_deposits,
            fee_debt: actor.state.fee_debt,
        })
    }

    async fn wallet_balance(&self, addr: &Address) -> DomainResult<TokenAmount> {
        self.rpc.call("WalletBalance", vec![param(addr)?]).await
    }
}
