//! Keystore port - named secret storage.

use crate::domain::errors::DomainResult;
use crate::domain::models::KeyInfo;

/// Named key records. `get` returns `None` for a missing name.
pub trait Keystore: Send + Sync {
    /// Record stored as `name`.
    fn get(&self, name: &str) -> DomainResult<Option<KeyInfo>>;

    /// Store `info` as `name`, replacing any record.
    fn put(&self, name: &str, info: &KeyInfo) -> DomainResult<()>;
}
