//! JSON-RPC 2.0 client for Lotus node APIs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::adapters::rpc::types::{JsonRpcRequest, JsonRpcResponse, METHOD_NAMESPACE};
use crate::domain::errors::{DomainError, DomainResult};

/// Calls `Filecoin.<Method>` on one node endpoint.
pub struct LotusRpcClient {
    url: String,
    token: Option<String>,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl LotusRpcClient {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> DomainResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::HttpClient(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            token,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call_value(&self, method: &str, params: Vec<Value>) -> DomainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, format!("{METHOD_NAMESPACE}{method}"), params);
        trace!(id, method, url = %self.url, "upstream call");

        let mut builder = self.http_client.post(&self.url).json(&request);
        if let Some(ref token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::upstream(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::upstream(
                method,
                format!("HTTP {status}: {}", body.trim()),
            ));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| DomainError::upstream(method, format!("invalid response: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(DomainError::upstream(
                method,
                format!("{} (code {})", err.message, err.code),
            ));
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Call `method` and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> DomainResult<T> {
        let value = self.call_value(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::upstream(method, format!("decoding result: {e}")))
    }

    /// Like [`Self::call`], treating a `null` result as `T::default()`.
    pub async fn call_or_default<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> DomainResult<T> {
        let value: Option<T> = self.call(method, params).await?;
        Ok(value.unwrap_or_default())
    }
}

/// Encode a call argument.
pub(crate) fn param<T: serde::Serialize>(value: T) -> DomainResult<Value> {
    Ok(serde_json::to_value(value)?)
}
