//! JSON-RPC transport: envelope types and the inbound gateway server.

pub mod server;
pub mod types;

pub use server::{required_permission, RpcServer, RpcServerConfig};
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcErrorCode, METHOD_NAMESPACE};
