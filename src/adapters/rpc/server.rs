//! Inbound JSON-RPC gateway.
//!
//! `POST /rpc/v0` accepts node-style calls (`Filecoin.<Method>`, positional
//! params). Callers authenticate with `Authorization: Bearer <token>` or a
//! `token` query parameter; each method then requires one permission.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::types::{JsonRpcRequest, JsonRpcResponse, RpcErrorCode, METHOD_NAMESPACE};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Address, Permission, SectorNumber, TipSetKey};
use crate::services::auth::require_permission;
use crate::services::{AuthGate, CachedGateway};

/// Gateway server settings.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Socket address to bind.
    pub listen: String,
    /// Upper bound on one RPC call.
    pub request_timeout: Duration,
    /// Allow cross-origin requests from anywhere.
    pub enable_cors: bool,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9988".to_string(),
            request_timeout: Duration::from_secs(60),
            enable_cors: true,
        }
    }
}

struct RpcState {
    gateway: CachedGateway,
    auth: Arc<AuthGate>,
    request_timeout: Duration,
}

/// Permission a gateway method needs, or `None` if the method is not served.
pub fn required_permission(method: &str) -> Option<Permission> {
    match method {
        "StateMinerInfo" | "StateGetActor" | "StateMinerPower" | "WalletBalance"
        | "MinerAssetInfo" | "MinerProvingInfo" | "ActorAddress" | "SectorsList"
        | "SectorsStatus" | "WorkerStats" | "WorkerJobs" | "MinerSectorsInfo"
        | "WorkerTaskInfo" | "StorageInfo" | "AuthVerify" => Some(Permission::Read),
        "AuthNew" => Some(Permission::Admin),
        _ => None,
    }
}

/// JSON-RPC gateway over a [`CachedGateway`].
pub struct RpcServer {
    config: RpcServerConfig,
    state: Arc<RpcState>,
}

impl RpcServer {
    /// Serve `gateway`, authorizing callers with `auth`.
    pub fn new(gateway: CachedGateway, auth: Arc<AuthGate>, config: RpcServerConfig) -> Self {
        let state = Arc::new(RpcState {
            gateway,
            auth,
            request_timeout: config.request_timeout,
        });
        Self { config, state }
    }

    /// Router with the RPC and health routes.
    pub fn build_router(&self) -> Router {
        let app = Router::new()
            .route("/rpc/v0", post(handle_rpc))
            .route("/health", get(health))
            .with_state(self.state.clone());

        if self.config.enable_cors {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.listen.parse()?;
        let router = self.build_router();

        let listener = TcpListener::bind(addr).await?;
        info!("Lotus gateway listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

async fn health(State(state): State<Arc<RpcState>>) -> impl IntoResponse {
    debug!(
        cached_entries = state.gateway.cache().entry_count(),
        "health check"
    );
    "OK"
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer token from the header, falling back to the `token` query parameter.
fn extract_token(headers: &HeaderMap, query: &TokenQuery) -> Result<String, &'static str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| "malformed authorization header")?;
        return value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or("missing Bearer prefix in auth header");
    }
    query.token.clone().ok_or("missing token")
}

async fn handle_rpc(
    State(state): State<Arc<RpcState>>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let permissions = match extract_token(&headers, &query) {
        Ok(token) => match state.auth.verify(&token) {
            Ok(perms) => perms,
            Err(err) => {
                warn!(error = %err, "rejected rpc call");
                return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
            }
        },
        Err(reason) => {
            warn!(reason, "rejected rpc call");
            return (StatusCode::UNAUTHORIZED, reason).into_response();
        }
    };

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return Json(JsonRpcResponse::error(
                None,
                RpcErrorCode::ParseError,
                err.to_string(),
            ))
            .into_response();
        }
    };

    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::error(
            request.id,
            RpcErrorCode::InvalidRequest,
            "jsonrpc must be \"2.0\"",
        ))
        .into_response();
    }

    let method = request
        .method
        .strip_prefix(METHOD_NAMESPACE)
        .unwrap_or(&request.method)
        .to_string();
    debug!(%method, "rpc call");

    let call = dispatch(&state, &permissions, &method, request.params);
    let result = match tokio::time::timeout(state.request_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::Timeout(state.request_timeout.as_secs())),
    };

    let response = match result {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(err) => {
            warn!(%method, error = %err, "rpc call failed");
            JsonRpcResponse::from_domain_error(request.id, &err)
        }
    };
    Json(response).into_response()
}

fn positional(params: Value) -> DomainResult<Vec<Value>> {
    match params {
        Value::Array(args) => Ok(args),
        Value::Null => Ok(Vec::new()),
        _ => Err(DomainError::InvalidParams(
            "params must be a positional array".to_string(),
        )),
    }
}

fn arg<T: DeserializeOwned>(args: &[Value], idx: usize, name: &str) -> DomainResult<T> {
    let value = args
        .get(idx)
        .ok_or_else(|| DomainError::InvalidParams(format!("missing param {idx} ({name})")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| DomainError::InvalidParams(format!("param {idx} ({name}): {e}")))
}

/// Like [`arg`], with a default when the param is absent or null.
fn arg_or_default<T: DeserializeOwned + Default>(
    args: &[Value],
    idx: usize,
    name: &str,
) -> DomainResult<T> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(_) => arg(args, idx, name),
    }
}

async fn dispatch(
    state: &RpcState,
    permissions: &[Permission],
    method: &str,
    params: Value,
) -> DomainResult<Value> {
    let required = required_permission(method)
        .ok_or_else(|| DomainError::MethodNotFound(format!("{METHOD_NAMESPACE}{method}")))?;
    require_permission(permissions, method, required)?;

    let args = positional(params)?;
    let gw = &state.gateway;

    let value = match method {
        "StateMinerInfo" => {
            let addr: Address = arg(&args, 0, "address")?;
            let tsk: TipSetKey = arg_or_default(&args, 1, "tipset key")?;
            serde_json::to_value(gw.state_miner_info(&addr, &tsk).await?)?
        }
        "StateGetActor" => {
            let addr: Address = arg(&args, 0, "address")?;
            let tsk: TipSetKey = arg_or_default(&args, 1, "tipset key")?;
            serde_json::to_value(gw.state_get_actor(&addr, &tsk).await?)?
        }
        "StateMinerPower" => {
            let addr: Address = arg(&args, 0, "address")?;
            let tsk: TipSetKey = arg_or_default(&args, 1, "tipset key")?;
            serde_json::to_value(gw.state_miner_power(&addr, &tsk).await?)?
        }
        "WalletBalance" => {
            let addr: Address = arg(&args, 0, "address")?;
            serde_json::to_value(gw.wallet_balance(&addr).await?)?
        }
        "MinerAssetInfo" => {
            let addr: Address = arg(&args, 0, "address")?;
            serde_json::to_value(gw.miner_asset_info(&addr).await?)?
        }
        "MinerProvingInfo" => {
            let addr: Address = arg(&args, 0, "address")?;
            serde_json::to_value(gw.miner_proving_info(&addr).await?)?
        }
        "ActorAddress" => serde_json::to_value(gw.actor_address().await?)?,
        "SectorsList" => serde_json::to_value(gw.sectors_list().await?)?,
        "SectorsStatus" => {
            let sector: SectorNumber = arg(&args, 0, "sector number")?;
            let show: bool = arg_or_default(&args, 1, "showOnChainInfo")?;
            serde_json::to_value(gw.sectors_status(sector, show).await?)?
        }
        "WorkerStats" => serde_json::to_value(gw.worker_stats().await?)?,
        "WorkerJobs" => serde_json::to_value(gw.worker_jobs().await?)?,
        "MinerSectorsInfo" => serde_json::to_value(gw.miner_sectors_info().await?)?,
        "WorkerTaskInfo" => serde_json::to_value(gw.worker_task_info().await?)?,
        "StorageInfo" => serde_json::to_value(gw.storage_info().await?)?,
        "AuthVerify" => {
            let token: String = arg(&args, 0, "token")?;
            serde_json::to_value(state.auth.verify(&token)?)?
        }
        "AuthNew" => {
            let perms: Vec<Permission> = arg(&args, 0, "permissions")?;
            // Byte-slice results travel as base64, as node clients expect.
            Value::String(STANDARD.encode(state.auth.sign(&perms)?))
        }
        other => return Err(DomainError::MethodNotFound(other.to_string())),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_required_permissions() {
        assert_eq!(
            required_permission("MinerAssetInfo"),
            Some(Permission::Read)
        );
        assert_eq!(required_permission("AuthNew"), Some(Permission::Admin));
        assert_eq!(required_permission("MpoolPush"), None);
    }

    #[test]
    fn test_extract_token_sources() {
        let mut headers = HeaderMap::new();
        let query = TokenQuery {
            token: Some("from-query".to_string()),
        };
        assert_eq!(extract_token(&headers, &query).unwrap(), "from-query");

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert_eq!(extract_token(&headers, &query).unwrap(), "abc");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc"));
        assert!(extract_token(&headers, &TokenQuery::default()).is_err());
        assert!(extract_token(&HeaderMap::new(), &TokenQuery::default()).is_err());
    }

    #[test]
    fn test_optional_args_default() {
        let args = vec![Value::from("f01000"), Value::Null];
        let tsk: TipSetKey = arg_or_default(&args, 1, "tsk").unwrap();
        assert!(tsk.is_empty());
        let show: bool = arg_or_default(&args, 5, "show").unwrap();
        assert!(!show);
        assert!(arg::<Address>(&args, 3, "address").is_err());
    }
}
