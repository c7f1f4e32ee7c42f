//! Per-endpoint health record.
//!
//! # Health Rule
//! ```text
//! healthy = total_requests == 0
//!        || (successful / total > success_ratio && no failure within cooldown)
//! ```
//!
//! # Design Decisions
//! - Untested endpoints are innocent until proven guilty
//! - `is_healthy` is derived after every outcome and again on every read,
//!   so a failure ageing out of the cooldown window is noticed without a new request

use serde::{Deserialize, Serialize};

/// Thresholds used to derive health.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    /// Success ratio that must be strictly exceeded.
    pub success_ratio: f64,
    /// A failure younger than this marks the endpoint unhealthy.
    pub failure_cooldown_ms: u64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            success_ratio: 0.8,
            failure_cooldown_ms: 60_000,
        }
    }
}

/// Request outcome counters for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Attempts announced but not yet resolved.
    pub pending_requests: u64,
    /// Running mean over successful requests, in milliseconds.
    pub average_latency_ms: f64,
    pub last_error: Option<String>,
    /// Unix milliseconds of the last failure.
    pub last_error_time: Option<u64>,
    pub is_healthy: bool,
}

impl EndpointHealth {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            pending_requests: 0,
            average_latency_ms: 0.0,
            last_error: None,
            last_error_time: None,
            is_healthy: true,
        }
    }

    /// Fraction of resolved requests that succeeded; 1.0 when untested.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }

    /// Evaluate the health rule at `now_ms`.
    pub fn evaluate(&self, policy: &HealthPolicy, now_ms: u64) -> bool {
        if self.total_requests == 0 {
            return true;
        }
        let recently_failed = self
            .last_error_time
            .map(|at| now_ms.saturating_sub(at) < policy.failure_cooldown_ms)
            .unwrap_or(false);
        self.success_rate() > policy.success_ratio && !recently_failed
    }

    pub(crate) fn mark_started(&mut self) {
        self.pending_requests += 1;
    }

    pub(crate) fn record_success(&mut self, latency_ms: f64, policy: &HealthPolicy, now_ms: u64) {
        self.pending_requests = self.pending_requests.saturating_sub(1);
        self.total_requests += 1;
        self.successful_requests += 1;
        self.average_latency_ms +=
            (latency_ms - self.average_latency_ms) / self.successful_requests as f64;
        self.is_healthy = self.evaluate(policy, now_ms);
    }

    pub(crate) fn record_failure(&mut self, error: &str, policy: &HealthPolicy, now_ms: u64) {
        self.pending_requests = self.pending_requests.saturating_sub(1);
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_error = Some(error.to_string());
        self.last_error_time = Some(now_ms);
        self.is_healthy = self.evaluate(policy, now_ms);
    }

    /// Copy with `is_healthy` re-derived at `now_ms`.
    pub(crate) fn snapshot(&self, policy: &HealthPolicy, now_ms: u64) -> Self {
        let mut copy = self.clone();
        copy.is_healthy = copy.evaluate(policy, now_ms);
        copy
    }
}
