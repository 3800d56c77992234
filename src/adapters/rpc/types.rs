//! JSON-RPC 2.0 envelope types.
//!
//! Used both by the inbound gateway and by the outbound node clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::DomainError;

/// Namespace prefix of every node method.
pub const METHOD_NAMESPACE: &str = "Filecoin.";

/// Gateway JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    /// Body is not valid JSON.
    ParseError = -32700,
    /// Not a JSON-RPC 2.0 request object.
    InvalidRequest = -32600,
    /// Unknown method.
    MethodNotFound = -32601,
    /// Parameters could not be decoded.
    InvalidParams = -32602,
    /// Token lacks the permission the method needs.
    PermissionDenied = -32001,
    /// The call did not finish within the request timeout.
    Timeout = -32003,
    /// Upstream or aggregation failure. Matches the code nodes use for method errors.
    Application = 1,
}

impl RpcErrorCode {
    /// Numeric code sent on the wire.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Default message for the code.
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::PermissionDenied => "Permission denied",
            Self::Timeout => "Request timed out",
            Self::Application => "Application error",
        }
    }
}

impl From<&DomainError> for RpcErrorCode {
    fn from(err: &DomainError) -> Self {
        match err {
            DomainError::PermissionDenied { .. } => Self::PermissionDenied,
            DomainError::InvalidParams(_) => Self::InvalidParams,
            DomainError::MethodNotFound(_) => Self::MethodNotFound,
            DomainError::Timeout(_) => Self::Timeout,
            _ => Self::Application,
        }
    }
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request id; absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Full method name, e.g. `Filecoin.ChainHead`.
    pub method: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Request with positional `params`.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params: Value::Array(params),
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the request answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Set on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Set on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying `result`.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response with `code`.
    pub fn error(id: Option<Value>, code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: code.code(),
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error response for a failed gateway call.
    pub fn from_domain_error(id: Option<Value>, err: &DomainError) -> Self {
        Self::error(id, RpcErrorCode::from(err), err.to_string())
    }
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// See [`RpcErrorCode`].
    pub code: i32,
    /// Human-readable description.
    pub message: String,
    /// Extra error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Permission;

    #[test]
    fn test_error_codes_from_domain_errors() {
        let denied = DomainError::PermissionDenied {
            method: "AuthNew".to_string(),
            required: Permission::Admin,
        };
        assert_eq!(RpcErrorCode::from(&denied).code(), -32001);
        assert_eq!(RpcErrorCode::from(&DomainError::Timeout(5)).code(), -32003);
        assert_eq!(
            RpcErrorCode::from(&DomainError::upstream("ChainHead", "eof")).code(),
            1
        );
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp =
            JsonRpcResponse::error(Some(Value::from(1)), RpcErrorCode::MethodNotFound, "nope");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32601);
    }
}
