//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the access layer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AccessConfig {
    /// RPC endpoints, in preference order.
    pub endpoints: EndpointsConfig,

    /// Cache defaults.
    pub cache: CacheConfig,

    /// Error ledger and health thresholds.
    pub tracker: TrackerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Endpoint pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    /// JSON-RPC endpoint URLs, highest priority first.
    pub urls: Vec<String>,

    /// Deadline for a single attempt in milliseconds (0 = none).
    pub attempt_timeout_ms: u64,

    /// HTTP client timeout for the JSON-RPC transport in seconds.
    pub request_timeout_secs: u64,
}

impl EndpointsConfig {
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_ms > 0).then(|| Duration::from_millis(self.attempt_timeout_ms))
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            attempt_timeout_ms: 10_000,
            request_timeout_secs: 30,
        }
    }
}

/// Cache defaults applied when a caller does not pass explicit options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live in milliseconds.
    pub default_ttl_ms: u64,

    /// Serve stale values while refreshing in the background.
    pub stale_while_revalidate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: 30_000,
            stale_while_revalidate: true,
        }
    }
}

/// Error tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum records kept in the error ledger.
    pub max_records: usize,

    /// Rolling window for the error rate in milliseconds.
    pub error_rate_window_ms: u64,

    /// Success ratio an endpoint must exceed to be healthy.
    pub healthy_success_ratio: f64,

    /// How long a failure keeps an endpoint unhealthy, in milliseconds.
    pub failure_cooldown_ms: u64,

    /// Number of records returned in `recent_errors`.
    pub recent_records: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_records: 500,
            error_rate_window_ms: 60_000,
            healthy_success_ratio: 0.8,
            failure_cooldown_ms: 60_000,
            recent_records: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "resilient_rpc=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
