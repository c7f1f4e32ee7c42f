//! Errors surfaced by the access layer.

use thiserror::Error;

use crate::tracker::classify::Classifier;
use crate::tracker::types::ErrorKind;

/// Failure returned to callers of the executor and cache.
///
/// `Clone` so one pending refresh can hand the same failure to every joined caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// The candidate list was empty. A configuration problem, not a network one.
    #[error("no RPC endpoints configured")]
    NoEndpoints,

    /// Every candidate was attempted and failed.
    #[error("all {attempts} RPC endpoint attempts failed; last error from {last_endpoint}: {last_error}")]
    Exhausted {
        attempts: usize,
        last_endpoint: String,
        last_error: String,
    },

    /// A cache producer failed outside the executor.
    #[error("producer failed: {0}")]
    Producer(String),

    /// The task running a refresh ended without a result.
    #[error("refresh task aborted: {0}")]
    RefreshAborted(String),
}

impl AccessError {
    /// Map onto the error taxonomy using the default classification rules.
    pub fn kind(&self) -> ErrorKind {
        self.kind_with(&Classifier::default())
    }

    /// Map onto the error taxonomy using `classifier`.
    pub fn kind_with(&self, classifier: &Classifier) -> ErrorKind {
        match self {
            AccessError::NoEndpoints => ErrorKind::Unknown,
            AccessError::Exhausted { last_error, .. } => {
                classifier.classify_or(last_error, ErrorKind::RpcNetwork)
            }
            AccessError::Producer(message) | AccessError::RefreshAborted(message) => {
                classifier.classify_or(message, ErrorKind::Unknown)
            }
        }
    }

    /// Whether retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Result type for access layer operations.
pub type AccessResult<T> = Result<T, AccessError>;
