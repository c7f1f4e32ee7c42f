//! Cached, failover-aware JSON-RPC client.
//!
//! # Responsibilities
//! - Key each read by method and params (optionally scoped to an owner)
//! - Serve it through the SWR cache, producing misses through the failover executor
//! - Expose tracker diagnostics for operational tooling

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::{owner_key, rpc_key};
use crate::cache::{CacheOptions, Cached, SwrCache};
use crate::config::AccessConfig;
use crate::error::AccessResult;
use crate::failover::FailoverExecutor;
use crate::rpc::transport::JsonRpcTransport;
use crate::rpc::types::TransportError;
use crate::tracker::{DiagnosticsSnapshot, ErrorTracker};

/// Read client combining the tracker, executor, cache and transport.
#[derive(Debug, Clone)]
pub struct RpcClient {
    tracker: Arc<ErrorTracker>,
    executor: FailoverExecutor,
    cache: SwrCache<Value>,
    transport: Arc<JsonRpcTransport>,
    default_options: CacheOptions,
}

impl RpcClient {
    /// Build every component from configuration.
    pub fn from_config(config: &AccessConfig) -> Result<Self, TransportError> {
        let tracker = Arc::new(ErrorTracker::new(config.tracker.clone()));
        let executor = FailoverExecutor::new(tracker.clone(), config.endpoints.urls.clone())
            .with_attempt_timeout(config.endpoints.attempt_timeout());
        let transport = JsonRpcTransport::new(Duration::from_secs(
            config.endpoints.request_timeout_secs,
        ))?;

        tracing::info!(
            endpoints = config.endpoints.urls.len(),
            ttl_ms = config.cache.default_ttl_ms,
            swr = config.cache.stale_while_revalidate,
            "RPC client initialized"
        );

        Ok(Self::from_parts(
            executor,
            SwrCache::with_clock(tracker.clock().clone()),
            Arc::new(transport),
            config.cache.clone().into(),
        ))
    }

    /// Assemble a client from existing components. The tracker is the executor's.
    pub fn from_parts(
        executor: FailoverExecutor,
        cache: SwrCache<Value>,
        transport: Arc<JsonRpcTransport>,
        default_options: CacheOptions,
    ) -> Self {
        Self {
            tracker: executor.tracker().clone(),
            executor,
            cache,
            transport,
            default_options,
        }
    }

    pub fn tracker(&self) -> &Arc<ErrorTracker> {
        &self.tracker
    }

    pub fn executor(&self) -> &FailoverExecutor {
        &self.executor
    }

    pub fn cache(&self) -> &SwrCache<Value> {
        &self.cache
    }

    /// Cached read with the configured default options.
    pub async fn call(&self, method: &str, params: Value) -> AccessResult<Cached<Value>> {
        self.call_with(method, params, self.default_options).await
    }

    /// Cached read with explicit options.
    pub async fn call_with(
        &self,
        method: &str,
        params: Value,
        options: CacheOptions,
    ) -> AccessResult<Cached<Value>> {
        let key = rpc_key(method, &params);
        self.cached(&key, method, params, options).await
    }

    /// Cached read scoped to `owner`, dropped by [`RpcClient::invalidate_owner`].
    pub async fn call_for_owner(
        &self,
        owner: &str,
        method: &str,
        params: Value,
        options: CacheOptions,
    ) -> AccessResult<Cached<Value>> {
        let key = owner_key(owner, &rpc_key(method, &params));
        self.cached(&key, method, params, options).await
    }

    /// Read through failover only, bypassing the cache.
    pub async fn call_uncached(&self, method: &str, params: Value) -> AccessResult<Value> {
        let transport = &self.transport;
        let params = &params;
        self.executor
            .run_default(|endpoint| async move { transport.call(&endpoint, method, params).await })
            .await
    }

    async fn cached(
        &self,
        key: &str,
        method: &str,
        params: Value,
        options: CacheOptions,
    ) -> AccessResult<Cached<Value>> {
        let executor = self.executor.clone();
        let transport = self.transport.clone();
        let method = method.to_string();

        let producer = move || async move {
            let transport = &transport;
            let method = method.as_str();
            let params = &params;
            executor
                .run_default(|endpoint| async move {
                    transport.call(&endpoint, method, params).await
                })
                .await
        };

        self.cache.with_cache(key, producer, options).await
    }

    /// Drop the cached value for one call.
    pub fn invalidate(&self, method: &str, params: &Value) -> bool {
        self.cache.invalidate(&rpc_key(method, params))
    }

    /// Drop everything cached for `owner`, e.g. when the connected wallet changes.
    pub fn invalidate_owner(&self, owner: &str) -> usize {
        let dropped = self.cache.invalidate_for_owner(owner);
        tracing::debug!(owner = %owner, dropped, "Owner cache invalidated");
        dropped
    }

    /// Replace the endpoint list, e.g. after a config reload.
    pub fn set_endpoints(&self, endpoints: Vec<String>) {
        self.executor.set_endpoints(endpoints);
    }

    /// Records, stats and endpoint health for external diagnostics.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.tracker.export_data()
    }
}
