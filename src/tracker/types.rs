//! Error taxonomy and ledger record types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Closed set of failure kinds the layer classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WalletConnection,
    WalletSignature,
    TransactionSimulation,
    TransactionSubmission,
    TransactionConfirmation,
    RpcNetwork,
    RpcTimeout,
    RpcRateLimit,
    AccountNotFound,
    InsufficientFunds,
    ProgramError,
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::WalletConnection,
        ErrorKind::WalletSignature,
        ErrorKind::TransactionSimulation,
        ErrorKind::TransactionSubmission,
        ErrorKind::TransactionConfirmation,
        ErrorKind::RpcNetwork,
        ErrorKind::RpcTimeout,
        ErrorKind::RpcRateLimit,
        ErrorKind::AccountNotFound,
        ErrorKind::InsufficientFunds,
        ErrorKind::ProgramError,
        ErrorKind::Unknown,
    ];

    /// Wire name, e.g. `rpc_timeout`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::WalletConnection => "wallet_connection",
            ErrorKind::WalletSignature => "wallet_signature",
            ErrorKind::TransactionSimulation => "transaction_simulation",
            ErrorKind::TransactionSubmission => "transaction_submission",
            ErrorKind::TransactionConfirmation => "transaction_confirmation",
            ErrorKind::RpcNetwork => "rpc_network",
            ErrorKind::RpcTimeout => "rpc_timeout",
            ErrorKind::RpcRateLimit => "rpc_rate_limit",
            ErrorKind::AccountNotFound => "account_not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::ProgramError => "program_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Coarse category, taken from the wire-name prefix.
    pub fn category(&self) -> ErrorCategory {
        let name = self.as_str();
        if name.starts_with("wallet_") {
            ErrorCategory::Wallet
        } else if name.starts_with("transaction_") {
            ErrorCategory::Transaction
        } else if name.starts_with("rpc_") {
            ErrorCategory::Rpc
        } else {
            ErrorCategory::Ui
        }
    }

    /// Transient failures worth retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RpcNetwork | ErrorKind::RpcTimeout | ErrorKind::RpcRateLimit
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category used to route log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Wallet,
    Transaction,
    Rpc,
    Ui,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Wallet => "wallet",
            ErrorCategory::Transaction => "transaction",
            ErrorCategory::Rpc => "rpc",
            ErrorCategory::Ui => "ui",
        }
    }
}

/// Severity passed to the logging collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single classified failure. Records are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub kind: ErrorKind,
    pub message: String,
    /// Free-form context, stored exactly as given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
