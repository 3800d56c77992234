//! Composite read models produced by aggregation and pushed to the collector.
//!
//! The snake_case field names are the collector's wire format. Lists that the
//! collector receives as `null` when empty use [`null_when_empty`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chain::{ChainEpoch, StoragePower, TokenAmount};

/// Account-level financial snapshot. All amounts are attoFIL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssetInfo {
    /// Miner actor address
    pub miner_id: String,
    /// Total balance of the miner actor
    pub miner_balance: TokenAmount,
    /// Block rewards still vesting
    pub vesting_funds: TokenAmount,
    /// Pledge locked for committed sectors
    pub initial_pledge_requirement: TokenAmount,
    /// Deposits held for pre-committed sectors
    pub pre_commit_deposits: TokenAmount,
    /// Balance minus every locked amount and fee debt; may be negative
    pub available_balance: TokenAmount,
    /// Balance of the address that pays for window PoSt messages
    pub post_balance: TokenAmount,
    /// Balance of the worker address
    pub worker_balance: TokenAmount,
    /// Quality-adjusted power claimed by the miner
    pub quality_adj_power: StoragePower,
    /// Balance of the owner address
    pub owner_balance: TokenAmount,
}

/// Summary of the current proving period.
///
/// Epoch strings read `"<epoch> (<relative time>)"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingInfo {
    /// Chain head height
    pub current_epoch: ChainEpoch,
    /// Offset of the proving period within the chain's period grid
    pub proving_period_boundary: ChainEpoch,
    /// Epoch the current proving period started
    pub proving_period_start: String,
    /// Epoch the next proving period starts
    pub next_period_start: String,
    /// `"<faulty> (<pct>%)"` over all deadlines
    pub faults: String,
    /// Sectors recovering across all deadlines
    pub recovering: u64,
    /// Index of the open deadline
    pub deadline_index: u64,
    /// Live sectors in the open deadline
    pub deadline_sectors: u64,
    /// Epoch the open deadline's window opened
    pub deadline_open: String,
    /// Epoch the open deadline's window closes
    pub deadline_close: String,
    /// Length of the deadline window as a coarse duration
    pub deadline_elapsed: String,
    /// Epoch the deadline's challenge is drawn at
    pub deadline_challenge: String,
    /// Last epoch for declaring faults in the deadline
    pub deadline_fault_cutoff: String,
}

/// Sector counts reported by the miner node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerSectorsInfo {
    /// Every sector the node knows about
    pub total_sectors: usize,
    /// Sectors in the `Proving` state
    pub proving: usize,
}

/// A worker and the sealing tasks assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTaskState {
    /// Worker id
    pub id: String,
    /// Host the worker runs on
    pub hostname: String,
    /// Whether the worker accepts tasks
    pub enable: bool,
    /// Running and queued tasks in node order
    #[serde(default, with = "null_when_empty")]
    pub sector_states: Vec<SectorState>,
}

/// One sealing task on a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorState {
    /// Short task label such as `PC1`
    pub task: String,
    /// Sector the task works on
    pub sector_num: u64,
    /// When the task started or was queued
    pub start: DateTime<Utc>,
    /// 0 while running, 1+ while queued.
    pub run_wait: i32,
}

/// One storage path of the miner.
///
/// `urls`, `weight`, `can_seal`, `can_store` and `local` are not collected and
/// always carry their zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Storage path id
    pub id: String,
    /// Sector files stored on the path
    pub sectors: Vec<StorageDecl>,
    /// Bytes; zero when the path could not be stat'ed
    pub capacity: i64,
    /// Bytes free for sector storage
    pub available: i64,
    /// Bytes reserved by in-flight tasks
    pub reserved: i64,
    /// Always `null`
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    /// Always 0
    #[serde(default)]
    pub weight: u64,
    /// Always false
    #[serde(default)]
    pub can_seal: bool,
    /// Always false
    #[serde(default)]
    pub can_store: bool,
    /// Always empty
    #[serde(default)]
    pub local: String,
}

/// A sector file declaration rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDecl {
    /// Miner actor id
    pub miner: String,
    /// Sector number in decimal
    pub sector_number: String,
    /// `unsealed`, `sealed`, `cache` or `<unknown N>`
    pub sector_file_type: String,
}

/// One tracked account's entry in a push batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedMinerInfo {
    /// Miner actor address
    pub miner_id: String,
    /// Proving period summary
    pub proving_info: ProvingInfo,
    /// Sector counts
    pub miner_sectors_info: MinerSectorsInfo,
    /// Workers and their tasks; `null` when there are none
    #[serde(default, with = "null_when_empty")]
    pub worker_task_state: Vec<WorkerTaskState>,
    /// Balances
    pub cluster_asset_info: ClusterAssetInfo,
    /// Storage paths in capacity order
    pub storage_info: Vec<StorageInfo>,
    /// Always 0
    pub message_count: u64,
}

/// Serialize an empty list as `null` and read `null` back as empty.
pub mod null_when_empty {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write `null` for an empty list, the list otherwise.
    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, T>(items: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        if items.is_empty() {
            serializer.serialize_none()
        } else {
            items.serialize(serializer)
        }
    }

    /// Read a list, treating `null` as empty.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn idle_worker() -> WorkerTaskState {
        WorkerTaskState {
            id: "w-1".to_string(),
            hostname: "sealer-01".to_string(),
            enable: true,
            sector_states: Vec::new(),
        }
    }

    #[test]
    fn test_idle_worker_sends_null_tasks() {
        let value = serde_json::to_value(idle_worker()).unwrap();
        assert_eq!(value["sector_states"], json!(null));

        let back: WorkerTaskState = serde_json::from_value(value).unwrap();
        assert!(back.sector_states.is_empty());
    }

    #[test]
    fn test_storage_info_carries_zero_valued_path_fields() {
        let value = serde_json::to_value(StorageInfo {
            id: "store-a".to_string(),
            capacity: 100,
            ..StorageInfo::default()
        })
        .unwrap();

        assert_eq!(value["sectors"], json!([]));
        assert_eq!(value["urls"], json!(null));
        assert_eq!(value["weight"], json!(0));
        assert_eq!(value["can_seal"], json!(false));
        assert_eq!(value["can_store"], json!(false));
        assert_eq!(value["local"], json!(""));
    }
}
