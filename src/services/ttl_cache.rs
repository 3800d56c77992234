//! String-keyed TTL cache using moka.
//!
//! Each entry carries its own time-to-live, so short-lived worker snapshots
//! and ordinary reads can share one store. Expired entries are never returned;
//! the sweeper only reclaims their memory.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::errors::{DomainError, DomainResult};

/// Build a cache key from a method tag and its canonical argument strings.
///
/// Every argument is length-prefixed, so no two distinct argument lists map
/// to the same key as long as `method` contains no `:`.
pub fn cache_key(method: &str, args: &[&str]) -> String {
    let capacity = method.len() + args.iter().map(|a| a.len() + 6).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push_str(method);
    for arg in args {
        let _ = write!(key, ":{}#{}", arg.len(), arg);
    }
    key
}

/// A stored value with the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,
    /// Lifetime the entry was stored with.
    pub ttl: Duration,
    /// When the entry stops being served.
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
        }
    }
}

struct PerEntryTtl;

impl<V> Expiry<String, CacheEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Time-expiring cache shared by every request handler.
#[derive(Clone)]
pub struct TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Empty cache whose [`Self::set_default`] uses `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        let entries = Cache::builder().expire_after(PerEntryTtl).build();
        Self {
            entries,
            default_ttl,
        }
    }

    /// TTL used by [`Self::set_default`].
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Live value stored under `key`.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    /// Full entry, including its expiry instant.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).await
    }

    /// Store `value` under `key` for `ttl`, replacing any entry.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries
            .insert(key.into(), CacheEntry::new(value, ttl))
            .await;
    }

    /// Like [`Self::set`] with the default TTL.
    pub async fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl).await;
    }

    /// Return the cached value for `key`, or run `compute` and store its
    /// result for `ttl`.
    ///
    /// Concurrent misses on the same key wait for a single computation. A
    /// failed computation stores nothing and every waiter receives the error.
    pub async fn get_or_try_insert<F>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        compute: F,
    ) -> DomainResult<V>
    where
        F: std::future::Future<Output = DomainResult<V>>,
    {
        self.entries
            .try_get_with(key.into(), async move {
                compute.await.map(|value| CacheEntry::new(value, ttl))
            })
            .await
            .map(|entry| entry.value)
            .map_err(|err: Arc<DomainError>| (*err).clone())
    }

    /// Purge expired entries now.
    pub async fn sweep(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Approximate number of live entries; exact right after [`Self::sweep`].
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Sweep on a fixed interval until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub fn spawn_sweeper(
        &self,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cache.sweep().await;
                        tracing::trace!(entries = cache.entry_count(), "cache swept");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("cache sweeper stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_after_set_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.set("k", 7_u32, Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await, Some(7));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache
            .set("k", "v".to_string(), Duration::from_millis(50))
            .await;
        assert!(cache.get("k").await.is_some());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_set_replaces_value_and_ttl() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.set("k", 1_u32, Duration::from_millis(50)).await;
        cache.set_default("k", 2_u32).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("k").await, Some(2));
        let entry = cache.entry("k").await.unwrap();
        assert_eq!(entry.ttl, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10));
        let err = cache
            .get_or_try_insert("k", Duration::from_secs(10), async {
                Err(DomainError::upstream("ChainHead", "boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Upstream { .. }));
        assert_eq!(cache.get("k").await, None);

        let value = cache
            .get_or_try_insert("k", Duration::from_secs(10), async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(cache.get("k").await, Some(5));
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_try_insert("shared", Duration::from_secs(10), async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(42)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired_entries() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.set("short", 1_u8, Duration::from_millis(20)).await;
        cache.set("long", 2_u8, Duration::from_secs(10)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.sweep().await;
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let cache: TtlCache<u8> = TtlCache::new(Duration::from_secs(10));
        let (tx, rx) = watch::channel(false);
        let handle = cache.spawn_sweeper(Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[test]
    fn test_cache_key_shape() {
        assert_eq!(cache_key("ActorAddress", &[]), "ActorAddress");
        assert_eq!(
            cache_key("SectorsStatus", &["12", "true"]),
            "SectorsStatus:2#12:4#true"
        );
    }

    proptest! {
        #[test]
        fn prop_cache_key_identical_inputs_match(
            method in "[A-Za-z]{1,16}",
            args in proptest::collection::vec(".*", 0..4),
        ) {
            let refs: Vec<&str> = args.iter().map(String::as_str).collect();
            prop_assert_eq!(cache_key(&method, &refs), cache_key(&method, &refs));
        }

        #[test]
        fn prop_cache_key_distinct_inputs_differ(
            a_method in "[A-Za-z]{1,8}",
            a_args in proptest::collection::vec("[a-z0-9:#,]{0,6}", 0..4),
            b_method in "[A-Za-z]{1,8}",
            b_args in proptest::collection::vec("[a-z0-9:#,]{0,6}", 0..4),
        ) {
            prop_assume!(a_method != b_method || a_args != b_args);
            let a: Vec<&str> = a_args.iter().map(String::as_str).collect();
            let b: Vec<&str> = b_args.iter().map(String::as_str).collect();
            prop_assert_ne!(cache_key(&a_method, &a), cache_key(&b_method, &b));
        }
    }
}
