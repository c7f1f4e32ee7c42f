//! Read-side aggregates exported by the tracker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tracker::health::EndpointHealth;
use crate::tracker::types::{ErrorKind, ErrorRecord};

/// Error ledger summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Errors tracked since construction or the last `clear()`.
    pub total_errors: u64,
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
    /// Errors per minute over the rolling window.
    pub error_rate: f64,
    /// Most recent records, oldest first.
    pub recent_errors: Vec<ErrorRecord>,
}

/// Transaction failure summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFailureStats {
    pub total_attempts: u64,
    pub total_failures: u64,
    pub failures_by_reason: BTreeMap<String, u64>,
    /// Failures as a percentage of attempts; 0 when nothing was attempted.
    pub failure_rate: f64,
}

/// Everything an operator needs to diagnose the layer, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    /// Unix milliseconds.
    pub exported_at: u64,
    pub errors: Vec<ErrorRecord>,
    pub stats: ErrorStats,
    pub transactions: TransactionFailureStats,
    pub endpoints: Vec<EndpointHealth>,
}

impl DiagnosticsSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
