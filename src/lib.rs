//! Resilient RPC Access Library
//!
//! Error tracking, endpoint health, multi-endpoint failover and a
//! stale-while-revalidate cache for reads against blockchain JSON-RPC nodes.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod failover;
pub mod observability;
pub mod rpc;
pub mod tracker;

pub use cache::{CacheOptions, Cached, SwrCache};
pub use config::schema::AccessConfig;
pub use error::{AccessError, AccessResult};
pub use failover::FailoverExecutor;
pub use rpc::RpcClient;
pub use tracker::{ErrorKind, ErrorTracker};
