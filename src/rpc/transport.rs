//! JSON-RPC over HTTP.
//!
//! # Responsibilities
//! - POST one JSON-RPC request to one endpoint
//! - Turn HTTP, timeout and JSON-RPC failures into a [`TransportError`]
//!
//! Failover is not done here; the executor decides which endpoint to call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::rpc::types::{RpcRequest, RpcResponse, TransportError};

/// Longest response body quoted in a status error.
const MAX_ERROR_BODY: usize = 256;

/// Stateless JSON-RPC caller shared by all endpoints.
#[derive(Debug)]
pub struct JsonRpcTransport {
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Build a transport whose HTTP requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` on `endpoint`.
    pub async fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);

        let response = self.client.post(endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RpcResponse = response.json().await?;
        body.into_result()
    }
}
