//! Adapters for external systems.

pub mod lotus;
pub mod mock;
pub mod rpc;
