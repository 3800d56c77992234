//! JSON-RPC gateway driven in-process through the axum router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Fixture;
use lotus_adapter::adapters::mock::MemoryKeystore;
use lotus_adapter::adapters::rpc::{RpcServer, RpcServerConfig};
use lotus_adapter::domain::models::Permission;
use lotus_adapter::services::AuthGate;

struct Harness {
    fx: Fixture,
    router: Router,
    auth: Arc<AuthGate>,
}

impl Harness {
    async fn new() -> Self {
        let fx = Fixture::new().await;
        let keystore = MemoryKeystore::default();
        let (auth, _) = AuthGate::load_or_generate(&keystore).unwrap();
        let auth = Arc::new(auth);
        let server = RpcServer::new(
            fx.gateway(Duration::from_secs(60), Duration::from_secs(3)),
            auth.clone(),
            RpcServerConfig::default(),
        );
        Self {
            router: server.build_router(),
            fx,
            auth,
        }
    }

    fn token(&self, perms: &[Permission]) -> String {
        self.auth.sign(perms).unwrap()
    }

    async fn call(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/rpc/v0")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn rpc(method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params})
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let h = Harness::new().await;
    let (status, _) = h.call(None, rpc("Filecoin.ActorAddress", json!([]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.fx.miner.total_calls().await, 0);
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let h = Harness::new().await;
    let other = AuthGate::load_or_generate(&MemoryKeystore::default())
        .unwrap()
        .0;
    let forged = other.sign(&Permission::ALL).unwrap();

    let (status, _) = h
        .call(Some(&forged), rpc("Filecoin.ActorAddress", json!([])))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_read_token_can_query() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let (status, body) = h
        .call(Some(&token), rpc("Filecoin.MinerSectorsInfo", json!([])))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["total_sectors"], 2);
    assert_eq!(body["result"]["proving"], 1);
}

#[tokio::test]
async fn test_query_with_address_and_null_tipset() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let (_, body) = h
        .call(
            Some(&token),
            rpc("Filecoin.StateMinerInfo", json!(["f01000", null])),
        )
        .await;

    assert_eq!(body["result"]["Owner"], "f0100");
    assert_eq!(body["result"]["Worker"], "f0101");
}

#[tokio::test]
async fn test_read_token_cannot_mint_tokens() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let (status, body) = h
        .call(Some(&token), rpc("Filecoin.AuthNew", json!([["admin"]])))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32001);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_admin_token_mints_verifiable_token() {
    use base64::Engine as _;

    let h = Harness::new().await;
    let admin = h.token(&Permission::ALL);

    let (_, body) = h
        .call(
            Some(&admin),
            rpc("Filecoin.AuthNew", json!([["read", "write"]])),
        )
        .await;
    let encoded = body["result"].as_str().unwrap();
    let minted = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    let minted = String::from_utf8(minted).unwrap();

    assert_eq!(
        h.auth.verify(&minted).unwrap(),
        vec![Permission::Read, Permission::Write]
    );

    let (_, body) = h
        .call(Some(&admin), rpc("Filecoin.AuthVerify", json!([minted])))
        .await;
    assert_eq!(body["result"], json!(["read", "write"]));
}

#[tokio::test]
async fn test_protocol_errors() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let (_, body) = h
        .call(Some(&token), rpc("Filecoin.MpoolPush", json!([])))
        .await;
    assert_eq!(body["error"]["code"], -32601);

    let (_, body) = h
        .call(
            Some(&token),
            rpc("Filecoin.WalletBalance", json!(["not-an-address"])),
        )
        .await;
    assert_eq!(body["error"]["code"], -32602);

    let (_, body) = h
        .call(
            Some(&token),
            json!({"jsonrpc": "1.0", "id": 2, "method": "Filecoin.ActorAddress"}),
        )
        .await;
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let request = Request::builder()
        .method("POST")
        .uri("/rpc/v0")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn test_upstream_failure_is_application_error() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);
    h.fx.miner.fail("StorageList").await;

    let (_, body) = h
        .call(Some(&token), rpc("Filecoin.StorageInfo", json!([])))
        .await;

    assert_eq!(body["error"]["code"], 1);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("StorageList"));
}

#[tokio::test]
async fn test_token_accepted_from_query() {
    let h = Harness::new().await;
    let token = h.token(&[Permission::Read]);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/rpc/v0?token={token}"))
        .body(Body::from(
            rpc("Filecoin.ActorAddress", json!([])).to_string(),
        ))
        .unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["result"], "f01000");
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}
