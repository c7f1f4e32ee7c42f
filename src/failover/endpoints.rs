//! Endpoint list and attempt ordering.
//!
//! # Responsibilities
//! - Hold the configured endpoint list, swappable on config reload
//! - Turn a candidate list plus a health snapshot into an attempt order
//!
//! # Ordering Rules
//! ```text
//! some candidate healthy:
//!     walk in priority order; skip an unhealthy candidate while a healthy
//!     one is still ahead of it, attempt everything else
//! no candidate healthy:
//!     attempt all, least-recently-failed first
//! ```

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::tracker::ErrorTracker;

/// Hot-swappable endpoint list, highest priority first.
#[derive(Debug)]
pub struct EndpointSet {
    inner: ArcSwap<Vec<String>>,
}

impl EndpointSet {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            inner: ArcSwap::from_pointee(endpoints),
        }
    }

    /// Current list. Runs already in progress keep the list they started with.
    pub fn load(&self) -> Arc<Vec<String>> {
        self.inner.load_full()
    }

    /// Replace the list atomically.
    pub fn replace(&self, endpoints: Vec<String>) {
        tracing::info!(count = endpoints.len(), "Endpoint list replaced");
        self.inner.store(Arc::new(endpoints));
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Health of one candidate at the start of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub endpoint: String,
    pub healthy: bool,
    pub last_error_time: Option<u64>,
}

/// Capture the health of every candidate once, so ordering is stable for the run.
pub fn snapshot(tracker: &ErrorTracker, endpoints: &[String]) -> Vec<Candidate> {
    endpoints
        .iter()
        .map(|endpoint| match tracker.rpc_endpoint_health(endpoint) {
            Some(h) => Candidate {
                endpoint: endpoint.clone(),
                healthy: h.is_healthy,
                last_error_time: h.last_error_time,
            },
            None => Candidate {
                endpoint: endpoint.clone(),
                healthy: true,
                last_error_time: None,
            },
        })
        .collect()
}

/// Indices of `candidates` in the order they should be attempted.
pub fn attempt_order(candidates: &[Candidate]) -> Vec<usize> {
    if !candidates.iter().any(|c| c.healthy) {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        // Stable sort keeps priority order among equal failure times.
        order.sort_by_key(|&i| candidates[i].last_error_time.unwrap_or(0));
        return order;
    }

    (0..candidates.len())
        .filter(|&i| candidates[i].healthy || !candidates[i + 1..].iter().any(|c| c.healthy))
        .collect()
}
