//! TTL cache with stale-while-revalidate and per-key request deduplication.
//!
//! # Lookup
//! ```text
//! fresh                 → stored value, no producer call
//! stale + SWR           → stored value now, background refresh unless one is in flight
//! miss / stale, no SWR  → join the in-flight refresh, or start one and await it
//! ```
//!
//! # Design Decisions
//! - Each key's slot is read and updated under its DashMap shard lock; no `.await` while held
//! - A refresh is owned by a token; completion only clears the in-flight handle it owns
//! - The producer runs in its own task, so it finishes and stores its result even if
//!   every caller stops waiting
//! - Invalidation drops the stored value but never aborts an in-flight refresh

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::cache::entry::{CacheEntry, CacheOptions, Cached};
use crate::cache::keys::owner_prefix;
use crate::clock::{Clock, SystemClock};
use crate::error::{AccessError, AccessResult};
use crate::observability::metrics;

type Pending<V> = Shared<BoxFuture<'static, AccessResult<V>>>;

struct InFlight<V> {
    token: u64,
    pending: Pending<V>,
}

struct Slot<V> {
    entry: Option<CacheEntry<V>>,
    in_flight: Option<InFlight<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            entry: None,
            in_flight: None,
        }
    }
}

/// Everything needed to finish a refresh once the producer resolves.
struct RefreshJob<V> {
    key: String,
    token: u64,
    options: CacheOptions,
    tx: oneshot::Sender<AccessResult<V>>,
}

enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

/// Lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub joined: u64,
}

#[derive(Default)]
struct Counters {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
}

struct CacheInner<V> {
    slots: DashMap<String, Slot<V>>,
    clock: Arc<dyn Clock>,
    next_token: AtomicU64,
    counters: Counters,
}

/// Keyed cache in front of a producer, usually a failover executor run.
pub struct SwrCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for SwrCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> std::fmt::Debug for SwrCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwrCache")
            .field("keys", &self.inner.slots.len())
            .finish()
    }
}

impl<V> Default for SwrCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SwrCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache reading `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: DashMap::new(),
                clock,
                next_token: AtomicU64::new(1),
                counters: Counters::default(),
            }),
        }
    }

    /// Return the value for `key`, invoking `producer` only when needed.
    pub async fn with_cache<F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: CacheOptions,
    ) -> AccessResult<Cached<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AccessResult<V>> + Send + 'static,
    {
        let now = self.inner.clock.now_ms();
        let counters = &self.inner.counters;

        let (pending, job, joined) = {
            let mut slot = self.inner.slots.entry(key.to_string()).or_default();

            let lookup = match &slot.entry {
                Some(entry) if entry.is_fresh(now) => Lookup::Fresh(entry.value.clone()),
                Some(entry) if options.stale_while_revalidate => Lookup::Stale(entry.value.clone()),
                _ => Lookup::Miss,
            };

            match lookup {
                Lookup::Fresh(value) => {
                    drop(slot);
                    counters.fresh_hits.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_lookup("fresh");
                    return Ok(Cached::fresh(value));
                }
                Lookup::Stale(value) => {
                    let job = if slot.in_flight.is_none() {
                        Some(self.begin_refresh(&mut slot, key, options).0)
                    } else {
                        None
                    };
                    drop(slot);
                    if let Some(job) = job {
                        tracing::debug!(key = %key, "Serving stale value, refreshing in background");
                        self.spawn_refresh(job, producer);
                    }
                    counters.stale_hits.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_lookup("stale");
                    return Ok(Cached::stale(value));
                }
                Lookup::Miss => {
                    let joined = slot.in_flight.as_ref().map(|f| f.pending.clone());
                    match joined {
                        Some(pending) => (pending, None, true),
                        None => {
                            let (job, pending) = self.begin_refresh(&mut slot, key, options);
                            (pending, Some(job), false)
                        }
                    }
                }
            }
        };

        if let Some(job) = job {
            counters.misses.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup("miss");
            self.spawn_refresh(job, producer);
        } else if joined {
            counters.joined.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup("joined");
        }

        pending.await.map(Cached::produced)
    }

    /// Register a new in-flight refresh on `slot`. Caller holds the shard lock.
    fn begin_refresh(
        &self,
        slot: &mut Slot<V>,
        key: &str,
        options: CacheOptions,
    ) -> (RefreshJob<V>, Pending<V>) {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let pending: Pending<V> = rx
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(AccessError::RefreshAborted("refresh task dropped".to_string()))
                })
            })
            .boxed()
            .shared();

        slot.in_flight = Some(InFlight {
            token,
            pending: pending.clone(),
        });

        let job = RefreshJob {
            key: key.to_string(),
            token,
            options,
            tx,
        };
        (job, pending)
    }

    fn spawn_refresh<F, Fut>(&self, job: RefreshJob<V>, producer: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AccessResult<V>> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(async move { producer().await }).await {
                Ok(result) => result,
                Err(e) => Err(AccessError::RefreshAborted(e.to_string())),
            };
            inner.complete(&job.key, job.token, job.options, &result);
            let _ = job.tx.send(result);
        });
    }

    /// Stored value for `key`, fresh or not, without triggering a refresh.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.inner
            .slots
            .get(key)
            .and_then(|slot| slot.entry.as_ref().map(|e| e.value.clone()))
    }

    /// Whether a refresh for `key` is outstanding.
    pub fn is_refreshing(&self, key: &str) -> bool {
        self.inner
            .slots
            .get(key)
            .map(|slot| slot.in_flight.is_some())
            .unwrap_or(false)
    }

    /// Drop the stored value for `key`. Returns whether a value was stored.
    pub fn invalidate(&self, key: &str) -> bool {
        let had_value = match self.inner.slots.get_mut(key) {
            Some(mut slot) => slot.entry.take().is_some(),
            None => false,
        };
        self.inner
            .slots
            .remove_if(key, |_, slot| slot.entry.is_none() && slot.in_flight.is_none());
        self.record_size();
        had_value
    }

    /// Drop every stored value whose key starts with `prefix`. Returns how many were dropped.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut dropped = 0;
        self.inner.slots.retain(|key, slot| {
            if !key.starts_with(prefix) {
                return true;
            }
            if slot.entry.take().is_some() {
                dropped += 1;
            }
            slot.in_flight.is_some()
        });
        tracing::debug!(prefix = %prefix, dropped, "Cache prefix invalidated");
        self.record_size();
        dropped
    }

    /// Drop everything scoped to `owner` (see [`crate::cache::keys::owner_key`]).
    pub fn invalidate_for_owner(&self, owner: &str) -> usize {
        self.invalidate_by_prefix(&owner_prefix(owner))
    }

    /// Drop every stored value. In-flight refreshes still complete.
    pub fn clear(&self) {
        self.inner.slots.retain(|_, slot| {
            slot.entry = None;
            slot.in_flight.is_some()
        });
        self.record_size();
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            fresh_hits: c.fresh_hits.load(Ordering::Relaxed),
            stale_hits: c.stale_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            joined: c.joined.load(Ordering::Relaxed),
        }
    }

    fn record_size(&self) {
        metrics::record_cache_size(self.inner.slots.len());
    }
}

impl<V: Clone> CacheInner<V> {
    /// Store the outcome of refresh `token` for `key`.
    fn complete(&self, key: &str, token: u64, options: CacheOptions, result: &AccessResult<V>) {
        let now = self.clock.now_ms();
        {
            let mut slot = self.slots.entry(key.to_string()).or_default();
            if slot.in_flight.as_ref().map(|f| f.token) == Some(token) {
                slot.in_flight = None;
            }
            match result {
                Ok(value) => {
                    slot.entry = Some(CacheEntry::new(value.clone(), now, options));
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache refresh failed");
                }
            }
        }
        if result.is_err() {
            self.slots
                .remove_if(key, |_, slot| slot.entry.is_none() && slot.in_flight.is_none());
        }
        metrics::record_cache_size(self.slots.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::owner_key;
    use crate::clock::ManualClock;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(10);

    fn cache() -> (SwrCache<u64>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (SwrCache::with_clock(clock.clone()), clock)
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: u64,
    ) -> impl FnOnce() -> BoxFuture<'static, AccessResult<u64>> + Send + 'static {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            .boxed()
        }
    }

    fn exploding() -> AccessResult<u64> {
        panic!("producer bug")
    }

    fn exploding_before_future() -> BoxFuture<'static, AccessResult<u64>> {
        panic!("producer bug")
    }

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_producer() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let callers = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .with_cache(
                        "account",
                        move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            gate.notified().await;
                            Ok(99)
                        },
                        CacheOptions::new(TTL),
                    )
                    .await
            })
        });
        let handles: Vec<_> = callers.collect();

        wait_until(|| calls.load(Ordering::SeqCst) == 1 && cache.stats().misses + cache.stats().joined == 8).await;
        gate.notify_one();

        for result in join_all(handles).await {
            let cached = result.unwrap().unwrap();
            assert_eq!(cached.data, 99);
            assert!(!cached.from_cache);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().joined, 7);
        assert!(!cache.is_refreshing("account"));
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_producer() {
        let (cache, clock) = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.with_cache("k", counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();
        assert!(!first.from_cache);

        clock.advance(TTL - Duration::from_millis(1));
        let second = cache.with_cache("k", counting(&calls, 2), CacheOptions::new(TTL)).await.unwrap();
        assert_eq!(second, Cached { data: 1, from_cache: true, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate() {
        let (cache, clock) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.with_cache("k", counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();
        clock.advance(TTL);

        let gate = Arc::new(Notify::new());
        let refresh_calls = calls.clone();
        let refresh_gate = gate.clone();
        let stale = cache
            .with_cache(
                "k",
                move || async move {
                    refresh_calls.fetch_add(1, Ordering::SeqCst);
                    refresh_gate.notified().await;
                    Ok(2)
                },
                CacheOptions::new(TTL),
            )
            .await
            .unwrap();
        assert_eq!(stale, Cached { data: 1, from_cache: true, is_stale: true });

        // A second stale read while the refresh is outstanding does not start another.
        let again = cache.with_cache("k", counting(&calls, 3), CacheOptions::new(TTL)).await.unwrap();
        assert!(again.is_stale);
        assert!(cache.is_refreshing("k"));

        wait_until(|| calls.load(Ordering::SeqCst) == 2).await;
        gate.notify_one();
        wait_until(|| cache.peek("k") == Some(2)).await;

        let fresh = cache.with_cache("k", counting(&calls, 4), CacheOptions::new(TTL)).await.unwrap();
        assert_eq!(fresh, Cached { data: 2, from_cache: true, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_without_swr_waits_for_producer() {
        let (cache, clock) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new(TTL).with_stale_while_revalidate(false);
        cache.with_cache("k", counting(&calls, 1), options).await.unwrap();
        clock.advance(TTL * 2);

        let got = cache.with_cache("k", counting(&calls, 2), options).await.unwrap();
        assert_eq!(got, Cached { data: 2, from_cache: false, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_miss_propagates_and_retries() {
        let (cache, _) = cache();
        let err = cache
            .with_cache(
                "k",
                || async { Err::<u64, _>(AccessError::Producer("node down".into())) },
                CacheOptions::new(TTL),
            )
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::Producer("node down".into()));
        assert!(!cache.is_refreshing("k"));
        assert!(cache.peek("k").is_none());

        let calls = Arc::new(AtomicUsize::new(0));
        let got = cache.with_cache("k", counting(&calls, 5), CacheOptions::new(TTL)).await.unwrap();
        assert_eq!(got.data, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_background_refresh_keeps_old_value() {
        let (cache, clock) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.with_cache("k", counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();
        clock.advance(TTL);

        let stale = cache
            .with_cache(
                "k",
                || async { Err::<u64, _>(AccessError::Producer("timeout".into())) },
                CacheOptions::new(TTL),
            )
            .await
            .unwrap();
        assert_eq!(stale.data, 1);

        wait_until(|| !cache.is_refreshing("k")).await;
        assert_eq!(cache.peek("k"), Some(1));

        // The next stale read retries.
        let again = cache.with_cache("k", counting(&calls, 7), CacheOptions::new(TTL)).await.unwrap();
        assert!(again.is_stale);
        wait_until(|| cache.peek("k") == Some(7)).await;
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_producer_call() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.with_cache("k", counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();

        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));

        let got = cache.with_cache("k", counting(&calls, 2), CacheOptions::new(TTL)).await.unwrap();
        assert_eq!(got, Cached { data: 2, from_cache: false, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_in_flight_refresh_survives_invalidation() {
        let (cache, _) = cache();
        let gate = Arc::new(Notify::new());
        let producer_gate = gate.clone();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .with_cache(
                        "k",
                        move || async move {
                            producer_gate.notified().await;
                            Ok(11)
                        },
                        CacheOptions::new(TTL),
                    )
                    .await
            })
        };

        wait_until(|| cache.is_refreshing("k")).await;
        cache.invalidate("k");
        assert!(cache.is_refreshing("k"));

        gate.notify_one();
        assert_eq!(waiter.await.unwrap().unwrap().data, 11);
        assert_eq!(cache.peek("k"), Some(11));
    }

    #[tokio::test]
    async fn test_abandoned_caller_still_populates() {
        let (cache, _) = cache();
        let result = tokio::time::timeout(
            Duration::from_millis(10),
            cache.with_cache(
                "k",
                || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(3)
                },
                CacheOptions::new(TTL),
            ),
        )
        .await;
        assert!(result.is_err());

        wait_until(|| cache.peek("k") == Some(3)).await;
        assert!(!cache.is_refreshing("k"));
    }

    #[tokio::test]
    async fn test_panicking_producer_clears_in_flight() {
        let (cache, _) = cache();
        let err = cache
            .with_cache("k", || async { exploding() }, CacheOptions::new(TTL))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::RefreshAborted(_)));
        assert!(!cache.is_refreshing("k"));
    }

    #[tokio::test]
    async fn test_producer_panicking_before_future_clears_in_flight() {
        let (cache, _) = cache();
        let err = cache
            .with_cache("k", exploding_before_future, CacheOptions::new(TTL))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::RefreshAborted(_)));
        assert!(!cache.is_refreshing("k"));

        let calls = Arc::new(AtomicUsize::new(0));
        let got = cache.with_cache("k", counting(&calls, 5), CacheOptions::new(TTL)).await.unwrap();
        assert_eq!(got, Cached { data: 5, from_cache: false, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blocking_read_joins_background_refresh() {
        let (cache, clock) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.with_cache("k", counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();
        clock.advance(TTL);

        let gate = Arc::new(Notify::new());
        let refresh_calls = calls.clone();
        let refresh_gate = gate.clone();
        let stale = cache
            .with_cache(
                "k",
                move || async move {
                    refresh_calls.fetch_add(1, Ordering::SeqCst);
                    refresh_gate.notified().await;
                    Ok(2)
                },
                CacheOptions::new(TTL),
            )
            .await
            .unwrap();
        assert!(stale.is_stale);
        assert!(cache.is_refreshing("k"));

        let blocking = {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                let options = CacheOptions::new(TTL).with_stale_while_revalidate(false);
                cache.with_cache("k", counting(&calls, 3), options).await
            })
        };

        wait_until(|| cache.stats().joined == 1).await;
        gate.notify_one();

        let got = blocking.await.unwrap().unwrap();
        assert_eq!(got, Cached { data: 2, from_cache: false, is_stale: false });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek("k"), Some(2));
    }

    #[tokio::test]
    async fn test_owner_and_prefix_invalidation() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let keys = [
            owner_key("alice", "balance"),
            owner_key("alice", "tokens"),
            owner_key("bob", "balance"),
            "global:slot".to_string(),
        ];
        for key in &keys {
            cache.with_cache(key, counting(&calls, 1), CacheOptions::new(TTL)).await.unwrap();
        }
        assert_eq!(cache.len(), 4);

        assert_eq!(cache.invalidate_for_owner("alice"), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&keys[2]).is_some());

        // Unscoped keys are not reachable through an owner.
        assert_eq!(cache.invalidate_for_owner("global"), 0);

        assert_eq!(cache.invalidate_by_prefix("glob"), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
