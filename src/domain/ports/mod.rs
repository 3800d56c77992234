//! Port trait definitions (Hexagonal Architecture)
//!
//! The two upstream capability sets the gateway composes:
//! - NodeApi: chain state of a full node
//! - MinerApi: sectors, workers and storage of a storage-miner node
//!
//! plus the Keystore holding the API signing secret.
//!
//! Services hold them as `Arc<dyn …>` so real RPC clients and in-memory mocks
//! are interchangeable.

pub mod keystore;
pub mod miner_api;
pub mod node_api;

pub use keystore::Keystore;
pub use miner_api::MinerApi;
pub use node_api::NodeApi;
