//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! caller → SwrCache::with_cache(key, producer, options)
//!     → fresh: stored value
//!     → stale + SWR: stored value, background refresh
//!     → miss: producer (usually FailoverExecutor::run) → stored → caller
//! ```
//!
//! # Design Decisions
//! - At most one producer per key at any instant; concurrent callers share its result
//! - Nothing is persisted; the cache lives as long as the process
//! - Owner-scoped keys (keys.rs) make per-identity invalidation a prefix drop

pub mod entry;
pub mod keys;
pub mod swr;

pub use entry::{CacheEntry, CacheOptions, Cached};
pub use swr::{CacheStats, SwrCache};
