//! Infrastructure layer module
//!
//! Concerns outside the domain:
//! - Configuration management
//! - Logging infrastructure
//! - File keystore for the API signing secret
//! - Lotus repo endpoint discovery
//!
//! Implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod keystore;
pub mod logging;
pub mod lotus_repo;
