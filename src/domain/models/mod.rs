/// Permissions and keystore records.
pub mod auth;
pub mod chain;
/// Configuration model.
pub mod config;
pub mod miner;
pub mod snapshot;

pub use auth::{KeyInfo, Permission, JWT_SECRET_KEY_NAME, JWT_SECRET_KEY_TYPE};
pub use chain::{
    Actor, Address, BitField, ChainEpoch, Cid, Claim, Deadline, DeadlineInfo, LockedFunds,
    MinerInfo, MinerPower, Partition, StoragePower, TipSet, TipSetKey, TokenAmount, ATTO_PER_FIL,
};
pub use config::{
    CacheConfig, ChainConfig, Config, GatewayConfig, LoggingConfig, MonitorConfig, UpstreamConfig,
};
pub use miner::{
    sector_file_type_name, task_short_name, Decl, FsStat, SectorId, SectorInfo, SectorNumber,
    StorageId, WorkerId, WorkerInfo, WorkerJob, WorkerStats, PROVING_STATE,
};
pub use snapshot::{
    ClusterAssetInfo, MinerSectorsInfo, ProvingInfo, PushedMinerInfo, SectorState, StorageDecl,
    StorageInfo, WorkerTaskState,
};
