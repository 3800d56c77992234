//! Storage-miner wire types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sector number within one miner.
pub type SectorNumber = u64;

/// Storage path identifier (a UUID string on real nodes).
pub type StorageId = String;

/// Worker identifier (a UUID string on real nodes).
pub type WorkerId = String;

/// Sector state tag counted as actively proving.
pub const PROVING_STATE: &str = "Proving";

/// Sector status. Only the identity and state are interpreted here; every
/// other field is preserved so the gateway can hand it back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorInfo {
    /// Sector number.
    #[serde(rename = "SectorID")]
    pub sector_id: SectorNumber,
    /// Sealing state tag such as `Proving`.
    pub state: String,
    /// Fields passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SectorInfo {
    /// Status with only the identity and state set.
    pub fn new(sector_id: SectorNumber, state: impl Into<String>) -> Self {
        Self {
            sector_id,
            state: state.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Whether the sector is in the `Proving` state.
    pub fn is_proving(&self) -> bool {
        self.state == PROVING_STATE
    }
}

/// Static information a worker reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerInfo {
    /// Host the worker runs on.
    pub hostname: String,
    /// Fields passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Worker entry of `WorkerStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerStats {
    /// Reported worker information.
    pub info: WorkerInfo,
    /// Whether the scheduler assigns tasks to the worker.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Resource usage and other fields passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

const fn enabled_by_default() -> bool {
    true
}

impl WorkerStats {
    /// Enabled or disabled worker on `hostname`.
    pub fn new(hostname: impl Into<String>, enabled: bool) -> Self {
        Self {
            info: WorkerInfo {
                hostname: hostname.into(),
                extra: BTreeMap::new(),
            },
            enabled,
            extra: BTreeMap::new(),
        }
    }
}

/// Sector identity across miners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorId {
    /// Miner actor id.
    pub miner: u64,
    /// Sector number.
    pub number: SectorNumber,
}

/// A sealing task assigned to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerJob {
    /// Sector the task works on.
    pub sector: SectorId,
    /// Full task type, e.g. `seal/v0/precommit/1`.
    pub task: String,
    /// 0 while running, 1+ while queued.
    pub run_wait: i32,
    /// When the task started or was queued.
    pub start: DateTime<Utc>,
    /// Worker host, when the node reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Sector file stored on a storage path. Flattened the way the node sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Decl {
    /// Miner actor id.
    pub miner: u64,
    /// Sector number.
    pub number: SectorNumber,
    /// File type bit: 1 unsealed, 2 sealed, 4 cache.
    pub sector_file_type: u32,
}

/// Filesystem usage of a storage path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsStat {
    /// Total bytes.
    pub capacity: i64,
    /// Bytes free for sector storage.
    pub available: i64,
    /// Bytes reserved by in-flight tasks.
    #[serde(default)]
    pub reserved: i64,
}

/// Short label for a sealing task type.
pub fn task_short_name(task: &str) -> &'static str {
    match task.trim() {
        "seal/v0/addpiece" => "AP",
        "seal/v0/precommit/1" => "PC1",
        "seal/v0/precommit/2" => "PC2",
        "seal/v0/commit/1" => "C1",
        "seal/v0/commit/2" => "C2",
        "seal/v0/finalize" => "FIN",
        "seal/v0/fetch" => "GET",
        "seal/v0/unseal" => "UNS",
        "seal/v0/unsealread" => "RD",
        _ => "UNK",
    }
}

/// Name of a sector file type bit.
pub fn sector_file_type_name(file_type: u32) -> String {
    match file_type {
        1 => "unsealed".to_string(),
        2 => "sealed".to_string(),
        4 => "cache".to_string(),
        other => format!("<unknown {other}>"),
    }
}
