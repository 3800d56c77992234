//! Composite read models built from several upstream calls.
//!
//! Every aggregation is all-or-nothing: the first failing upstream call aborts
//! it and the error is returned as is. Storage stat failures are the one
//! exception and degrade to zero capacity.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    sector_file_type_name, task_short_name, Address, ClusterAssetInfo, FsStat, MinerInfo,
    MinerSectorsInfo, ProvingInfo, PushedMinerInfo, SectorState, StorageDecl, StorageInfo,
    TipSetKey, TokenAmount, WorkerTaskState,
};
use crate::domain::ports::{MinerApi, NodeApi};
use crate::services::epoch_time::{epoch_time, epochs_duration};

/// Sector tallies from one walk over every deadline and partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectorTally {
    /// Live sectors across every deadline.
    pub proving: u64,
    /// Faulty sectors across every deadline.
    pub faults: u64,
    /// Recovering sectors across every deadline.
    pub recovering: u64,
    /// Live sectors in the current deadline.
    pub deadline_sectors: u64,
}

/// Fault ratio as a percentage truncated to two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn fault_percentage(faults: u64, proving: u64) -> f64 {
    if proving == 0 {
        return 0.0;
    }
    (faults.saturating_mul(10_000) / proving) as f64 / 100.0
}

/// `"<faults> (<pct>%)"` as shown in [`ProvingInfo::faults`].
pub fn format_faults(faults: u64, proving: u64) -> String {
    format!("{faults} ({:.2}%)", fault_percentage(faults, proving))
}

/// Order storage paths by capacity, largest first, then by id.
pub fn sort_storage(paths: &mut [StorageInfo]) {
    paths.sort_by(|a, b| b.capacity.cmp(&a.capacity).then_with(|| a.id.cmp(&b.id)));
}

/// Combines node and miner queries into the gateway's composite views.
pub struct AggregationEngine {
    node: Arc<dyn NodeApi>,
    miner: Arc<dyn MinerApi>,
    block_delay_secs: u64,
}

impl AggregationEngine {
    /// Engine over `node` and `miner` for a chain with `block_delay_secs` per epoch.
    pub fn new(node: Arc<dyn NodeApi>, miner: Arc<dyn MinerApi>, block_delay_secs: u64) -> Self {
        Self {
            node,
            miner,
            block_delay_secs,
        }
    }

    /// Full node the engine reads chain state from.
    pub fn node(&self) -> &Arc<dyn NodeApi> {
        &self.node
    }

    /// Miner node the engine reads sectors, workers and storage from.
    pub fn miner(&self) -> &Arc<dyn MinerApi> {
        &self.miner
    }

    /// Walk every deadline and partition at `tsk`, counting live, faulty and
    /// recovering sectors. Live sectors of `current_deadline` are also
    /// counted separately.
    pub async fn tally_sectors(
        &self,
        addr: &Address,
        tsk: &TipSetKey,
        current_deadline: u64,
    ) -> DomainResult<SectorTally> {
        let deadlines = self.node.state_miner_deadlines(addr, tsk).await?;
        let mut tally = SectorTally::default();

        for dl_idx in 0..deadlines.len() as u64 {
            let partitions = self.node.state_miner_partitions(addr, dl_idx, tsk).await?;
            for part in &partitions {
                let live = part.live_sectors.count();
                tally.proving += live;
                if dl_idx == current_deadline {
                    tally.deadline_sectors += live;
                }
                tally.faults += part.faulty_sectors.count();
                tally.recovering += part.recovering_sectors.count();
            }
        }

        Ok(tally)
    }

    /// Current proving period of `addr`, with sector tallies over every
    /// deadline and partition.
    #[instrument(skip(self), fields(miner = %addr))]
    pub async fn proving_info(&self, addr: &Address) -> DomainResult<ProvingInfo> {
        let head = self.node.chain_head().await?;
        let tsk = head.key();
        let cd = self.node.state_miner_proving_deadline(addr, &tsk).await?;
        let tally = self.tally_sectors(addr, &tsk, cd.index).await?;

        debug!(
            proving = tally.proving,
            faults = tally.faults,
            recovering = tally.recovering,
            "proving walk complete"
        );

        let at = |epoch| epoch_time(cd.current_epoch, epoch, self.block_delay_secs);
        let proving_period_boundary = if cd.wpost_proving_period == 0 {
            0
        } else {
            cd.period_start % cd.wpost_proving_period
        };

        Ok(ProvingInfo {
            current_epoch: cd.current_epoch,
            proving_period_boundary,
            proving_period_start: at(cd.period_start),
            next_period_start: at(cd.period_start + cd.wpost_proving_period),
            faults: format_faults(tally.faults, tally.proving),
            recovering: tally.recovering,
            deadline_index: cd.index,
            deadline_sectors: tally.deadline_sectors,
            deadline_open: at(cd.open),
            deadline_close: at(cd.close),
            deadline_elapsed: epochs_duration(
                u64::try_from(cd.close - cd.open).unwrap_or(0),
                self.block_delay_secs,
            ),
            deadline_challenge: at(cd.challenge),
            deadline_fault_cutoff: at(cd.fault_cutoff),
        })
    }

    /// First control address holding at least `min_funds`, else the worker.
    pub async fn post_address(
        &self,
        info: &MinerInfo,
        min_funds: &TokenAmount,
    ) -> DomainResult<Address> {
        for addr in &info.control_addresses {
            let balance = self.node.wallet_balance(addr).await?;
            if &balance >= min_funds {
                return Ok(addr.clone());
            }
            debug!(control = %addr, %balance, "control address below PoSt minimum");
        }
        Ok(info.worker.clone())
    }

    /// Balances of `addr` and its owner, worker and PoSt addresses.
    ///
    /// Fails as a whole if any upstream call fails.
    #[instrument(skip(self), fields(miner = %addr))]
    pub async fn asset_info(&self, addr: &Address) -> DomainResult<ClusterAssetInfo> {
        let head = TipSetKey::empty();
        let info = self.node.state_miner_info(addr, &head).await?;
        let actor = self.node.state_get_actor(addr, &head).await?;
        let power = self.node.state_miner_power(addr, &head).await?;
        let locked = self.node.state_miner_locked_funds(addr, &head).await?;
        let available_balance = locked.available_balance(&actor.balance);

        let post_addr = self.post_address(&info, &TokenAmount::from_fil(1)).await?;
        let post_balance = self.node.wallet_balance(&post_addr).await?;
        let worker_balance = self.node.wallet_balance(&info.worker).await?;
        let owner_balance = self.node.wallet_balance(&info.owner).await?;

        Ok(ClusterAssetInfo {
            miner_id: addr.to_string(),
            miner_balance: actor.balance,
            vesting_funds: locked.vesting_funds,
            initial_pledge_requirement: locked.initial_pledge_requirement,
            pre_commit_deposits: locked.pre_commit_deposits,
            available_balance,
            post_balance,
            worker_balance,
            quality_adj_power: power.miner_power.quality_adj_power,
            owner_balance,
        })
    }

    /// Count all sectors and those in the `Proving` state.
    #[instrument(skip(self))]
    pub async fn sectors_info(&self) -> DomainResult<MinerSectorsInfo> {
        let sectors = self.miner.sectors_list().await?;
        let mut info = MinerSectorsInfo {
            total_sectors: sectors.len(),
            proving: 0,
        };

        for sector in sectors {
            if self.miner.sectors_status(sector, false).await?.is_proving() {
                info.proving += 1;
            }
        }

        Ok(info)
    }

    /// Join worker stats with their jobs. Workers without jobs get an empty
    /// task list; jobs of workers missing from the stats are left out.
    #[instrument(skip(self))]
    pub async fn worker_task_info(&self) -> DomainResult<Vec<WorkerTaskState>> {
        let mut jobs = self.miner.worker_jobs().await?;
        let stats = self.miner.worker_stats().await?;

        let states = stats
            .into_iter()
            .map(|(id, st)| {
                let sector_states = jobs
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|job| SectorState {
                        task: task_short_name(&job.task).to_string(),
                        sector_num: job.sector.number,
                        start: job.start,
                        run_wait: job.run_wait,
                    })
                    .collect();

                WorkerTaskState {
                    id,
                    hostname: st.info.hostname,
                    enable: st.enabled,
                    sector_states,
                }
            })
            .collect();

        if !jobs.is_empty() {
            debug!(
                orphaned = jobs.len(),
                "jobs reported for workers without stats"
            );
        }

        Ok(states)
    }

    /// Storage paths with their sector files, sorted with [`sort_storage`].
    ///
    /// A path whose stat call fails is reported with zero capacity.
    #[instrument(skip(self))]
    pub async fn storage_info(&self) -> DomainResult<Vec<StorageInfo>> {
        let listing = self.miner.storage_list().await?;
        let mut paths = Vec::with_capacity(listing.len());

        for (id, decls) in listing {
            let stat = match self.miner.storage_stat(&id).await {
                Ok(stat) => stat,
                Err(err) => {
                    warn!(storage = %id, error = %err, "storage stat failed, using zero capacity");
                    FsStat::default()
                }
            };

            paths.push(StorageInfo {
                id,
                sectors: decls
                    .iter()
                    .map(|decl| StorageDecl {
                        miner: decl.miner.to_string(),
                        sector_number: decl.number.to_string(),
                        sector_file_type: sector_file_type_name(decl.sector_file_type),
                    })
                    .collect(),
                capacity: stat.capacity,
                available: stat.available,
                reserved: stat.reserved,
                ..StorageInfo::default()
            });
        }

        sort_storage(&mut paths);
        Ok(paths)
    }

    /// Everything pushed to the collector for one miner.
    #[instrument(skip(self), fields(miner = %addr))]
    pub async fn snapshot(&self, addr: &Address) -> DomainResult<PushedMinerInfo> {
        Ok(PushedMinerInfo {
            miner_id: addr.to_string(),
            proving_info: self.proving_info(addr).await?,
            miner_sectors_info: self.sectors_info().await?,
            cluster_asset_info: self.asset_info(addr).await?,
            worker_task_state: self.worker_task_info().await?,
            storage_info: self.storage_info().await?,
            message_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(id: &str, capacity: i64) -> StorageInfo {
        StorageInfo {
            id: id.to_string(),
            capacity,
            ..StorageInfo::default()
        }
    }

    #[test]
    fn test_fault_percentage_truncates_before_dividing() {
        assert!((fault_percentage(3, 10) - 30.0).abs() < f64::EPSILON);
        assert!((fault_percentage(1, 3) - 33.33).abs() < 1e-9);
        assert!((fault_percentage(2, 3) - 66.66).abs() < 1e-9);
        assert!(fault_percentage(5, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_faults() {
        assert_eq!(format_faults(3, 10), "3 (30.00%)");
        assert_eq!(format_faults(0, 0), "0 (0.00%)");
        assert_eq!(format_faults(2, 3), "2 (66.66%)");
    }

    #[test]
    fn test_sort_storage_capacity_desc_then_id() {
        let mut paths = vec![path("A", 100), path("C", 200), path("B", 200)];
        sort_storage(&mut paths);
        let ids: Vec<_> = paths.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["B", "C", "A"]);
    }
}
