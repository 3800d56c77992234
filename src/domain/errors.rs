//! Domain errors for the Lotus adapter.
//!
//! Every variant carries owned strings so the error is `Clone`: a single
//! cache computation may fail once and be reported to every caller that was
//! waiting on the same key.

use thiserror::Error;

use super::models::Permission;

/// Domain-level errors that can occur in the gateway, aggregation and push paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// An upstream node call failed (transport, HTTP status or JSON-RPC error).
    #[error("upstream call {method} failed: {message}")]
    Upstream {
        /// JSON-RPC method that was called
        method: String,
        /// Failure description
        message: String,
    },

    /// A token was missing, malformed, expired or signed with another secret.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The verified token does not grant the permission the method needs.
    #[error("missing permission to invoke '{method}' (need '{required}')")]
    PermissionDenied {
        /// Requested gateway method
        method: String,
        /// Permission the method needs
        required: Permission,
    },

    /// Parameters for a gateway method could not be decoded.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Unknown gateway method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The collector answered with a non-200 status.
    #[error("push rejected by {url}: status {status}, body: {body}")]
    PushRejected {
        /// Collector endpoint
        url: String,
        /// HTTP status returned
        status: u16,
        /// Response body
        body: String,
    },

    /// The collector could not be reached.
    #[error("push to {url} failed: {message}")]
    PushFailed {
        /// Collector endpoint
        url: String,
        /// Transport error
        message: String,
    },

    /// Keystore read/write failure.
    #[error("keystore error: {0}")]
    Keystore(String),

    /// The HTTP client for an upstream or the collector could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A gateway call exceeded the request timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl DomainError {
    /// Shorthand for an upstream failure of `method`.
    pub fn upstream(method: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            method: method.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Keystore(err.to_string())
    }
}
