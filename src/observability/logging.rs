//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber
//! - Provide the synchronous log sink the error tracker forwards to
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured filter
//! - Sinks are synchronous so `track_error` can call them inline

use std::fmt::Debug;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;
use crate::tracker::types::{ErrorCategory, LogLevel};

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.clone().into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Receiver of summarized error events.
pub trait LogSink: Debug + Send + Sync {
    fn log(
        &self,
        category: ErrorCategory,
        level: LogLevel,
        message: &str,
        metadata: Option<&serde_json::Value>,
    );
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(
        &self,
        category: ErrorCategory,
        level: LogLevel,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) {
        let category = category.as_str();
        let metadata = metadata.map(ToString::to_string).unwrap_or_default();
        match level {
            LogLevel::Debug => tracing::debug!(category, metadata = %metadata, "{}", message),
            LogLevel::Info => tracing::info!(category, metadata = %metadata, "{}", message),
            LogLevel::Warn => tracing::warn!(category, metadata = %metadata, "{}", message),
            LogLevel::Error => tracing::error!(category, metadata = %metadata, "{}", message),
        }
    }
}

/// One event captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub category: ErrorCategory,
    pub level: LogLevel,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

/// Keeps events in memory; handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LoggedEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LogSink for MemorySink {
    fn log(
        &self,
        category: ErrorCategory,
        level: LogLevel,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LoggedEvent {
                category,
                level,
                message: message.to_string(),
                metadata: metadata.cloned(),
            });
    }
}
