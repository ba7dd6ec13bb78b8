//! Bounded in-memory cache with a fixed time-to-live.
//!
//! Used twice: once for the upstream version list (few entries, short TTL)
//! and once for fetched files keyed by `(commit, path)` (many entries, long
//! TTL). Expired entries are never returned; when the cache is full the least
//! recently used entry is dropped.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::hash::Hash;
use std::time::Duration;

pub struct ContentCache<K, V> {
    cache: Cache<K, V>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> ContentCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        let cache = Cache::builder()
            .max_capacity(capacity as u64)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        tracing::debug!(
            capacity = capacity,
            ttl_secs = ttl.as_secs(),
            "Content cache created"
        );

        Self {
            cache,
            capacity,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached value, or `None` if absent or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    /// Insert or replace.
    pub fn set(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    /// Number of live entries, after pending evictions have been applied.
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
