//! Expiring key/value store shared by every analyzer.
//!
//! Entries are visible while `now - written_at <= ttl`. Expiry is lazy: a stale
//! entry is removed when it is looked up, when capacity is needed, or by the
//! optional background sweeper.

use crate::config::CacheConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

// =============================================================================
// Clock
// =============================================================================

/// Millisecond wall clock used for entry timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for deterministic expiry tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_millis`.
    #[must_use]
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: i64,
}

/// Time-to-live cache with an optional capacity bound.
///
/// A `max_size` of zero means unbounded. When a new key is inserted at
/// capacity, expired entries are purged first and then the oldest write is
/// evicted.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl_ms: i64,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache using the system clock.
    #[must_use]
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self::with_clock(ttl, max_size, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(ttl: Duration, max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            max_size,
            clock,
        }
    }

    /// Creates a cache from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_millis(config.ttl_ms), config.max_size)
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.ttl_ms).unwrap_or(0))
    }

    /// Returns the value for `key` if present and fresh.
    ///
    /// A stale entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` and returns it.
    pub fn set(&self, key: impl Into<String>, value: V) -> V {
        let key = key.into();
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        if self.max_size > 0 && !entries.contains_key(&key) && entries.len() >= self.max_size {
            entries.retain(|_, entry| now - entry.written_at <= self.ttl_ms);

            if entries.len() >= self.max_size {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.written_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(key = %oldest, "cache at capacity, evicting oldest entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                written_at: now,
            },
        );
        value
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.written_at <= self.ttl_ms);
        before - entries.len()
    }

    /// Number of stored entries, including stale ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: i64) -> bool {
        now - entry.written_at <= self.ttl_ms
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Spawns a background task that purges expired entries every `interval`.
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_ms: u64, max_size: usize) -> (TtlCache<i32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = TtlCache::with_clock(Duration::from_millis(ttl_ms), max_size, clock.clone());
        (cache, clock)
    }

    // ============================================
    // get / set
    // ============================================

    #[test]
    fn set_returns_value_and_get_reads_it() {
        let (cache, _) = cache_with_clock(1_000, 0);
        assert_eq!(cache.set("a", 7), 7);
        assert_eq!(cache.get("a"), Some(7));
    }

    #[test]
    fn unknown_key_is_absent() {
        let (cache, _) = cache_with_clock(1_000, 0);
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn entry_visible_at_exact_ttl_boundary() {
        let (cache, clock) = cache_with_clock(1_000, 0);
        cache.set("a", 1);
        clock.advance(Duration::from_millis(1_000));
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn stale_entry_is_absent_and_purged_on_lookup() {
        let (cache, clock) = cache_with_clock(1_000, 0);
        cache.set("a", 1);
        clock.advance(Duration::from_millis(1_001));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let (cache, clock) = cache_with_clock(1_000, 0);
        cache.set("a", 1);
        clock.advance(Duration::from_millis(800));
        cache.set("a", 2);
        clock.advance(Duration::from_millis(800));
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn clear_removes_everything() {
        let (cache, _) = cache_with_clock(1_000, 0);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    // ============================================
    // Capacity
    // ============================================

    #[test]
    fn zero_max_size_is_unbounded() {
        let (cache, _) = cache_with_clock(1_000, 0);
        for i in 0..100 {
            cache.set(format!("k{i}"), i);
        }
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn full_cache_evicts_oldest_write() {
        let (cache, clock) = cache_with_clock(10_000, 2);
        cache.set("first", 1);
        clock.advance(Duration::from_millis(10));
        cache.set("second", 2);
        clock.advance(Duration::from_millis(10));
        cache.set("third", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some(2));
        assert_eq!(cache.get("third"), Some(3));
    }

    #[test]
    fn full_cache_prefers_dropping_expired_entries() {
        let (cache, clock) = cache_with_clock(100, 2);
        cache.set("stale", 1);
        clock.advance(Duration::from_millis(90));
        cache.set("fresh", 2);
        clock.advance(Duration::from_millis(20));
        cache.set("new", 3);

        assert_eq!(cache.get("fresh"), Some(2));
        assert_eq!(cache.get("new"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwriting_existing_key_at_capacity_does_not_evict() {
        let (cache, _) = cache_with_clock(1_000, 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    // ============================================
    // Sweeping
    // ============================================

    #[test]
    fn purge_expired_counts_removed_entries() {
        let (cache, clock) = cache_with_clock(100, 0);
        cache.set("old", 1);
        clock.advance(Duration::from_millis(150));
        cache.set("young", 2);

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("young"), Some(2));
    }

    #[tokio::test]
    async fn sweeper_stops_when_cache_dropped() {
        let cache: Arc<TtlCache<i32>> = Arc::new(TtlCache::new(Duration::from_millis(5), 0));
        let handle = cache.spawn_sweeper(Duration::from_millis(1));
        drop(cache);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit")
            .expect("sweeper should not panic");
    }

    #[test]
    fn from_config_uses_ttl() {
        let config = CacheConfig {
            ttl_ms: 2_500,
            max_size: 10,
            sweep_interval_secs: 0,
        };
        let cache: TtlCache<i32> = TtlCache::from_config(&config);
        assert_eq!(cache.ttl(), Duration::from_millis(2_500));
    }
}
