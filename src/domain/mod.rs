//! Domain layer for the Lotus adapter
//!
//! Wire types shared with the upstream nodes, the composite read models, and
//! the port traits through which services reach the nodes.

pub mod errors;
/// Wire types and read models.
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
