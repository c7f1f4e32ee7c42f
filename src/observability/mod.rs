//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Tracker, executor and cache produce:
//!     → logging.rs (structured log events, LogSink for tracked errors)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (endpoint, key, kind)
//! - Metrics are cheap and safe to record with no exporter installed

pub mod logging;
pub mod metrics;
