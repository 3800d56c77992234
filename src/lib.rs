//! Lotus Adapter - caching, aggregating gateway for Lotus nodes
//!
//! Sits between RPC clients and a Lotus full node plus a storage-miner node.
//! Upstream reads are cached with a time-to-live, access is gated by JWT
//! permissions, and several composite read-models (proving, assets, sectors,
//! workers, storage) are assembled from multiple upstream calls. A push
//! daemon periodically snapshots those aggregates to a remote collector.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): errors, wire models and upstream ports
//! - **Service Layer** (`services`): cache, aggregation, auth and push logic
//! - **Adapters** (`adapters`): Lotus JSON-RPC clients, the inbound RPC server, mocks
//! - **Infrastructure Layer** (`infrastructure`): config, logging, keystore, repo discovery
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use lotus_adapter::{ConfigLoader, services::AggregationEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     // Build clients, then an engine, then serve or push.
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
/// Gateway, aggregation and push services.
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Address, Config, Permission, ProvingInfo, PushedMinerInfo, TipSetKey, TokenAmount,
};
pub use domain::ports::{Keystore, MinerApi, NodeApi};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AggregationEngine, AuthGate, CachedGateway, Processor, PushDaemon, TtlCache};
