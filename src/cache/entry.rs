//! Cache entry and lookup result types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CacheConfig;

/// Per-call cache options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a stored value counts as fresh.
    pub ttl: Duration,
    /// Serve a stale value immediately and refresh in the background.
    pub stale_while_revalidate: bool,
}

impl CacheOptions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            stale_while_revalidate: true,
        }
    }

    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheConfig::default().into()
    }
}

impl From<CacheConfig> for CacheOptions {
    fn from(config: CacheConfig) -> Self {
        Self {
            ttl: Duration::from_millis(config.default_ttl_ms),
            stale_while_revalidate: config.stale_while_revalidate,
        }
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Unix milliseconds.
    pub stored_at: u64,
    pub ttl: Duration,
    pub stale_while_revalidate: bool,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, stored_at: u64, options: CacheOptions) -> Self {
        Self {
            value,
            stored_at,
            ttl: options.ttl,
            stale_while_revalidate: options.stale_while_revalidate,
        }
    }

    /// `now - stored_at < ttl`.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        (now_ms.saturating_sub(self.stored_at) as u128) < self.ttl.as_millis()
    }
}

/// Value returned by a cache lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cached<V> {
    pub data: V,
    /// Served from a stored entry rather than a producer run.
    pub from_cache: bool,
    /// The stored entry was past its TTL.
    pub is_stale: bool,
}

impl<V> Cached<V> {
    pub(crate) fn fresh(data: V) -> Self {
        Self {
            data,
            from_cache: true,
            is_stale: false,
        }
    }

    pub(crate) fn stale(data: V) -> Self {
        Self {
            data,
            from_cache: true,
            is_stale: true,
        }
    }

    pub(crate) fn produced(data: V) -> Self {
        Self {
            data,
            from_cache: false,
            is_stale: false,
        }
    }
}
