//! Error classification and endpoint health tracking.
//!
//! # Data Flow
//! ```text
//! Failover executor:
//!     track_rpc_request → attempt → track_rpc_success / track_rpc_failure
//!     → EndpointHealth updated (health.rs)
//!     → failures classified (classify.rs) → track_error
//!
//! Callers (domain failures):
//!     track_error / track_transaction_failure
//!     → ErrorRecord appended to bounded ledger
//!     → summarized event forwarded to the LogSink
//!
//! Operators:
//!     error_stats / rpc_endpoint_health / export_data (stats.rs)
//! ```
//!
//! # Design Decisions
//! - One explicit tracker instance shared by `Arc`, never a global
//! - Bookkeeping never fails: poisoned locks are recovered, metadata is not validated
//! - The ledger is a ring buffer; the oldest record goes first

pub mod classify;
pub mod health;
pub mod stats;
pub mod types;

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::observability::logging::{LogSink, TracingSink};
use crate::observability::metrics;

pub use classify::{Classifier, Rule};
pub use health::{EndpointHealth, HealthPolicy};
pub use stats::{DiagnosticsSnapshot, ErrorStats, TransactionFailureStats};
pub use types::{ErrorCategory, ErrorKind, ErrorRecord, LogLevel};

#[derive(Debug, Default)]
struct Ledger {
    records: VecDeque<ErrorRecord>,
    total: u64,
    by_kind: BTreeMap<ErrorKind, u64>,
}

#[derive(Debug, Default)]
struct TransactionCounters {
    attempts: u64,
    failures: u64,
    by_reason: HashMap<String, u64>,
}

/// Single source of truth for failure classification, error rates and endpoint health.
#[derive(Debug)]
pub struct ErrorTracker {
    config: TrackerConfig,
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
    classifier: Classifier,
    sink: Arc<dyn LogSink>,
    ledger: Mutex<Ledger>,
    endpoints: DashMap<String, EndpointHealth>,
    transactions: Mutex<TransactionCounters>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ErrorTracker {
    /// Create a tracker reading the system clock and logging through `tracing`.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(TracingSink))
    }

    /// Create a tracker with an explicit clock and log sink.
    pub fn with_parts(config: TrackerConfig, clock: Arc<dyn Clock>, sink: Arc<dyn LogSink>) -> Self {
        let policy = HealthPolicy {
            success_ratio: config.healthy_success_ratio,
            failure_cooldown_ms: config.failure_cooldown_ms,
        };
        Self {
            config,
            policy,
            clock,
            classifier: Classifier::default(),
            sink,
            ledger: Mutex::new(Ledger::default()),
            endpoints: DashMap::new(),
            transactions: Mutex::new(TransactionCounters::default()),
        }
    }

    /// Replace the classification rules.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // --- Error ledger ---

    /// Append a classified error and forward a summary to the log sink.
    pub fn track_error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> ErrorRecord {
        let record = ErrorRecord {
            id: Uuid::new_v4(),
            timestamp: self.clock.now_ms(),
            kind,
            message: message.into(),
            metadata,
        };

        {
            let mut ledger = lock(&self.ledger);
            ledger.records.push_back(record.clone());
            while ledger.records.len() > self.config.max_records {
                ledger.records.pop_front();
            }
            ledger.total += 1;
            *ledger.by_kind.entry(kind).or_insert(0) += 1;
        }

        metrics::record_error(kind);

        let level = if kind.is_retryable() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        };
        self.sink.log(
            kind.category(),
            level,
            &format!("{}: {}", kind, record.message),
            record.metadata.as_ref(),
        );

        record
    }

    /// Classify `message` with the configured rules, falling back to `fallback`.
    pub fn classify(&self, message: &str, fallback: ErrorKind) -> ErrorKind {
        self.classifier.classify_or(message, fallback)
    }

    /// Records currently held in the ledger, oldest first.
    pub fn records(&self) -> Vec<ErrorRecord> {
        lock(&self.ledger).records.iter().cloned().collect()
    }

    // --- Endpoint outcomes ---

    /// Announce an attempt against `endpoint`.
    pub fn track_rpc_request(&self, endpoint: &str) {
        self.endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointHealth::new(endpoint))
            .mark_started();
    }

    /// Resolve an attempt as successful.
    pub fn track_rpc_success(&self, endpoint: &str, latency_ms: f64) {
        let now = self.clock.now_ms();
        let healthy = {
            let mut entry = self
                .endpoints
                .entry(endpoint.to_string())
                .or_insert_with(|| EndpointHealth::new(endpoint));
            entry.record_success(latency_ms, &self.policy, now);
            entry.is_healthy
        };
        metrics::record_endpoint_attempt(endpoint, "success", Some(latency_ms));
        metrics::record_endpoint_health(endpoint, healthy);
    }

    /// Resolve an attempt as failed and record the classified error.
    pub fn track_rpc_failure(&self, endpoint: &str, error: &str) -> ErrorKind {
        let now = self.clock.now_ms();
        let (healthy, transitioned) = {
            let mut entry = self
                .endpoints
                .entry(endpoint.to_string())
                .or_insert_with(|| EndpointHealth::new(endpoint));
            let was_healthy = entry.is_healthy;
            entry.record_failure(error, &self.policy, now);
            (entry.is_healthy, was_healthy && !entry.is_healthy)
        };
        metrics::record_endpoint_attempt(endpoint, "failure", None);
        metrics::record_endpoint_health(endpoint, healthy);

        if transitioned {
            tracing::warn!(endpoint = %endpoint, error = %error, "Endpoint marked unhealthy");
        }

        let kind = self.classify(error, ErrorKind::RpcNetwork);
        self.track_error(
            kind,
            error,
            Some(serde_json::json!({ "endpoint": endpoint })),
        );
        kind
    }

    // --- Transactions ---

    /// Count a transaction attempt.
    pub fn track_transaction_attempt(&self) {
        lock(&self.transactions).attempts += 1;
    }

    /// Count a transaction failure under a free-form `reason`.
    pub fn track_transaction_failure(&self, reason: &str, message: &str) -> ErrorKind {
        {
            let mut tx = lock(&self.transactions);
            tx.failures += 1;
            *tx.by_reason.entry(reason.to_string()).or_insert(0) += 1;
        }
        let kind = self.classify(message, ErrorKind::TransactionSubmission);
        self.track_error(kind, message, Some(serde_json::json!({ "reason": reason })));
        kind
    }

    // --- Read surface ---

    /// Ledger summary with the rolling error rate.
    pub fn error_stats(&self) -> ErrorStats {
        let now = self.clock.now_ms();
        let window = self.config.error_rate_window_ms.max(1);
        let since = now.saturating_sub(window);

        let ledger = lock(&self.ledger);
        let recent = ledger
            .records
            .iter()
            .rev()
            .take_while(|r| r.timestamp >= since)
            .count();
        let skip = ledger.records.len().saturating_sub(self.config.recent_records);

        ErrorStats {
            total_errors: ledger.total,
            errors_by_kind: ledger.by_kind.clone(),
            error_rate: recent as f64 * 60_000.0 / window as f64,
            recent_errors: ledger.records.iter().skip(skip).cloned().collect(),
        }
    }

    /// Transaction failure summary.
    pub fn transaction_failure_stats(&self) -> TransactionFailureStats {
        let tx = lock(&self.transactions);
        let failure_rate = if tx.attempts == 0 {
            0.0
        } else {
            tx.failures as f64 / tx.attempts as f64 * 100.0
        };
        TransactionFailureStats {
            total_attempts: tx.attempts,
            total_failures: tx.failures,
            failures_by_reason: tx.by_reason.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            failure_rate,
        }
    }

    /// True when errors per minute exceed `threshold`.
    pub fn is_error_rate_high(&self, threshold: f64) -> bool {
        self.error_stats().error_rate > threshold
    }

    /// True when the transaction failure percentage exceeds `threshold`.
    pub fn is_transaction_failure_rate_high(&self, threshold: f64) -> bool {
        self.transaction_failure_stats().failure_rate > threshold
    }

    /// Health of one endpoint, re-derived now. `None` if never seen.
    pub fn rpc_endpoint_health(&self, endpoint: &str) -> Option<EndpointHealth> {
        let now = self.clock.now_ms();
        self.endpoints
            .get(endpoint)
            .map(|h| h.snapshot(&self.policy, now))
    }

    /// Health of every tracked endpoint, sorted by endpoint.
    pub fn all_endpoint_health(&self) -> Vec<EndpointHealth> {
        let now = self.clock.now_ms();
        let mut all: Vec<_> = self
            .endpoints
            .iter()
            .map(|h| h.snapshot(&self.policy, now))
            .collect();
        all.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        all
    }

    /// Endpoints currently judged unhealthy.
    pub fn unhealthy_endpoints(&self) -> Vec<EndpointHealth> {
        self.all_endpoint_health()
            .into_iter()
            .filter(|h| !h.is_healthy)
            .collect()
    }

    /// Whether `endpoint` is healthy right now; untracked endpoints are.
    pub fn is_endpoint_healthy(&self, endpoint: &str) -> bool {
        let now = self.clock.now_ms();
        self.endpoints
            .get(endpoint)
            .map(|h| h.evaluate(&self.policy, now))
            .unwrap_or(true)
    }

    /// Serializable snapshot of records, stats and health.
    pub fn export_data(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            exported_at: self.clock.now_ms(),
            errors: self.records(),
            stats: self.error_stats(),
            transactions: self.transaction_failure_stats(),
            endpoints: self.all_endpoint_health(),
        }
    }

    /// Reset every counter and ledger.
    pub fn clear(&self) {
        *lock(&self.ledger) = Ledger::default();
        *lock(&self.transactions) = TransactionCounters::default();
        self.endpoints.clear();
        tracing::debug!("Error tracker cleared");
    }
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
