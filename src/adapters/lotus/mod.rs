//! Lotus JSON-RPC adapters implementing the upstream ports.

pub mod miner;
pub mod node;
pub mod rpc_client;

pub use miner::LotusMinerClient;
pub use node::LotusNodeClient;
pub use rpc_client::LotusRpcClient;
