pub mod aggregation;
pub mod auth;
pub mod cached_gateway;
pub mod epoch_time;
pub mod pusher;
pub mod ttl_cache;

pub use aggregation::{AggregationEngine, SectorTally};
pub use auth::{require_permission, ApiSecret, AuthGate};
pub use cached_gateway::CachedGateway;
pub use pusher::{DaemonHandle, DaemonStatus, Processor, PushDaemon, PushDaemonConfig};
pub use ttl_cache::{cache_key, CacheEntry, TtlCache};
