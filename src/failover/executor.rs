//! Endpoint failover executor.
//!
//! # Responsibilities
//! - Run one logical operation against interchangeable endpoints
//! - Report every attempt to the error tracker
//! - Hide individual endpoint failures as long as one endpoint answers
//!
//! # Design Decisions
//! - No backoff between endpoints; a failure moves straight to the next candidate
//! - A timeout is just another failure
//! - The surfaced error keeps the last endpoint's message

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

use crate::error::{AccessError, AccessResult};
use crate::failover::endpoints::{attempt_order, snapshot, EndpointSet};
use crate::tracker::ErrorTracker;

/// Executes operations against a prioritized endpoint list.
#[derive(Debug, Clone)]
pub struct FailoverExecutor {
    tracker: Arc<ErrorTracker>,
    endpoints: Arc<EndpointSet>,
    attempt_timeout: Option<Duration>,
}

impl FailoverExecutor {
    /// Create an executor over `endpoints`, highest priority first.
    pub fn new(tracker: Arc<ErrorTracker>, endpoints: Vec<String>) -> Self {
        Self {
            tracker,
            endpoints: Arc::new(EndpointSet::new(endpoints)),
            attempt_timeout: None,
        }
    }

    /// Bound every attempt by `deadline`.
    pub fn with_attempt_timeout(mut self, deadline: Option<Duration>) -> Self {
        self.attempt_timeout = deadline;
        self
    }

    pub fn tracker(&self) -> &Arc<ErrorTracker> {
        &self.tracker
    }

    /// The configured endpoint list.
    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    /// Replace the configured endpoint list.
    pub fn set_endpoints(&self, endpoints: Vec<String>) {
        self.endpoints.replace(endpoints);
    }

    /// Run `operation` against the configured endpoint list.
    pub async fn run_default<T, E, F, Fut>(&self, operation: F) -> AccessResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let endpoints = self.endpoints.load();
        self.run(operation, &endpoints).await
    }

    /// Run `operation` against `endpoints` until one succeeds.
    pub async fn run<T, E, F, Fut>(&self, operation: F, endpoints: &[String]) -> AccessResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if endpoints.is_empty() {
            tracing::error!("Failover run with no endpoints");
            return Err(AccessError::NoEndpoints);
        }

        let candidates = snapshot(&self.tracker, endpoints);
        let order = attempt_order(&candidates);
        if order.len() < candidates.len() {
            tracing::debug!(
                skipped = candidates.len() - order.len(),
                "Skipping unhealthy endpoints"
            );
        }

        let mut last_failure = None;
        for (attempt, &index) in order.iter().enumerate() {
            let endpoint = &candidates[index].endpoint;

            self.tracker.track_rpc_request(endpoint);
            let started = Instant::now();
            let outcome = match self.attempt_timeout {
                Some(deadline) => match timeout(deadline, operation(endpoint.clone())).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(format!(
                        "request timed out after {} ms",
                        deadline.as_millis()
                    )),
                },
                None => operation(endpoint.clone()).await.map_err(|e| e.to_string()),
            };

            match outcome {
                Ok(value) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.tracker.track_rpc_success(endpoint, latency_ms);
                    if attempt > 0 {
                        tracing::info!(endpoint = %endpoint, attempt, "Failover succeeded");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(endpoint = %endpoint, attempt, error = %error, "RPC attempt failed, trying next endpoint");
                    self.tracker.track_rpc_failure(endpoint, &error);
                    last_failure = Some((endpoint.clone(), error));
                }
            }
        }

        let (last_endpoint, last_error) =
            last_failure.unwrap_or_else(|| (String::new(), "no endpoint attempted".to_string()));
        tracing::error!(
            attempts = order.len(),
            last_endpoint = %last_endpoint,
            last_error = %last_error,
            "All RPC endpoints failed"
        );
        Err(AccessError::Exhausted {
            attempts: order.len(),
            last_endpoint,
            last_error,
        })
    }
}
