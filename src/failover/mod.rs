//! Endpoint failover subsystem.
//!
//! # Data Flow
//! ```text
//! Operation for one logical request:
//!     → endpoints.rs (snapshot health, compute attempt order)
//!     → executor.rs (attempt in order, optional per-attempt deadline)
//!         → tracker: track_rpc_request / success / failure
//!     → first success returned, or Exhausted with the last error
//! ```
//!
//! # Design Decisions
//! - Health is read once per run so ordering is deterministic for that run
//! - Unhealthy endpoints are still attempted when nothing healthy is left,
//!   which is how recovery gets noticed

pub mod endpoints;
pub mod executor;

pub use endpoints::EndpointSet;
pub use executor::FailoverExecutor;
