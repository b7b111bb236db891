//! In-memory bounded cache with fixed time-to-live.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use blobfs_core::constants::{OPEN_FILES_EXPIRE_TIME, OPEN_FILES_INIT_CAPACITY, OPEN_FILES_MAX_CAPACITY};
use blobfs_core::error::{BlobFsError, Result};

/// Cache entry with its insertion time.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, expire_time: Duration) -> bool {
        self.inserted_at.elapsed() >= expire_time
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Initial allocation hint
    pub initial_capacity: usize,
    /// Maximum number of distinct keys
    pub max_entries: usize,
    /// Age at which an entry stops being returned
    pub expire_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: OPEN_FILES_INIT_CAPACITY,
            max_entries: OPEN_FILES_MAX_CAPACITY,
            expire_time: OPEN_FILES_EXPIRE_TIME,
        }
    }
}

/// Thread-safe key/value cache bounded by entry count and age.
///
/// # Expiration
///
/// The TTL is fixed: only [`put`](Self::put) stamps an entry, reads never
/// extend its life. Expired entries are reclaimed lazily by `get`, and
/// eagerly when a new key arrives at a full cache.
///
/// # Capacity
///
/// The limit applies to distinct keys. Replacing an existing key never fails.
/// Inserts are admitted one at a time so concurrent puts cannot overshoot it;
/// reads and deletes go straight to the sharded map.
pub struct ExpiringCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    admission: Mutex<()>,
    config: CacheConfig,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        let initial = config.initial_capacity.min(config.max_entries);
        Self {
            entries: DashMap::with_capacity(initial),
            admission: Mutex::new(()),
            config,
        }
    }

    /// Inserts or replaces `key`, stamped with the current time.
    ///
    /// A new key arriving at a full cache first triggers a purge of expired
    /// entries; if the cache is still full the insert is rejected with
    /// [`BlobFsError::CapacityExceeded`].
    pub fn put(&self, key: K, value: V) -> Result<()> {
        let _admission = self.admission.lock();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            let purged = self.purge_expired();
            if self.entries.len() >= self.config.max_entries {
                debug!(capacity = self.config.max_entries, purged, "Cache full, rejecting insert");
                return Err(BlobFsError::CapacityExceeded {
                    capacity: self.config.max_entries,
                });
            }
            debug!(purged, "Made room by purging expired entries");
        }

        self.entries.insert(key, CacheEntry::new(value));
        Ok(())
    }

    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry is removed as a side effect. Does not refresh the age.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.config.expire_time) => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }

        // Guard released above; a concurrent re-put is not expired and survives.
        let expire_time = self.config.expire_time;
        self.entries.remove_if(key, |_, entry| entry.is_expired(expire_time));
        None
    }

    /// Removes `key`. No-op if absent.
    pub fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Returns the number of stored entries.
    ///
    /// This is the raw count: expired entries not yet reclaimed are included.
    /// Use [`stats`](Self::stats) for a live/expired split.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `key` is stored and not expired.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(self.config.expire_time))
            .unwrap_or(false)
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let expire_time = self.config.expire_time;
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(expire_time);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    /// Returns clones of all live entries.
    ///
    /// The scan walks the map one shard at a time: entries inserted or removed
    /// concurrently may or may not be seen. No lock is held once this returns.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        let expire_time = self.config.expire_time;
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(expire_time))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let expire_time = self.config.expire_time;
        let mut total = 0;
        let mut expired = 0;
        for entry in self.entries.iter() {
            total += 1;
            if entry.value().is_expired(expire_time) {
                expired += 1;
            }
        }
        CacheStats {
            total_entries: total,
            expired_entries: expired,
            live_entries: total - expired,
            capacity: self.config.max_entries,
        }
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<K, V> Default for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub live_entries: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn small_cache(max_entries: usize, expire_ms: u64) -> ExpiringCache<u64, String> {
        ExpiringCache::with_config(CacheConfig {
            initial_capacity: max_entries,
            max_entries,
            expire_time: Duration::from_millis(expire_ms),
        })
    }

    #[test]
    fn test_cache_put_get() {
        let cache = ExpiringCache::new();
        cache.put(1u64, "alpha".to_string()).unwrap();
        assert_eq!(cache.get(&1).as_deref(), Some("alpha"));
    }

    #[test]
    fn test_cache_miss() {
        let cache: ExpiringCache<u64, String> = ExpiringCache::new();
        assert!(cache.get(&404).is_none());
    }

    #[test]
    fn test_cache_replace_keeps_count() {
        let cache = ExpiringCache::new();
        cache.put(1u64, "old".to_string()).unwrap();
        cache.put(1u64, "new".to_string()).unwrap();
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.get(&1).as_deref(), Some("new"));
    }

    #[test]
    fn test_cache_delete() {
        let cache = ExpiringCache::new();
        cache.put(1u64, "alpha".to_string()).unwrap();
        cache.delete(&1);
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_delete_missing_is_noop() {
        let cache = small_cache(2, 1_000);
        cache.put(1, "alpha".to_string()).unwrap();
        cache.delete(&99);
        cache.delete(&99);
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let cache = ExpiringCache::new();
        cache.put(1u64, "a".to_string()).unwrap();
        cache.put(2u64, "b".to_string()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_rejects_new_key() {
        let cache = small_cache(2, 60_000);
        cache.put(1, "a".to_string()).unwrap();
        cache.put(2, "b".to_string()).unwrap();

        let err = cache.put(3, "c".to_string()).unwrap_err();
        assert!(matches!(err, BlobFsError::CapacityExceeded { capacity: 2 }));
        assert_eq!(cache.count(), 2);
        assert!(cache.get(&3).is_none());
    }

    #[test]
    fn test_capacity_allows_replace_when_full() {
        let cache = small_cache(2, 60_000);
        cache.put(1, "a".to_string()).unwrap();
        cache.put(2, "b".to_string()).unwrap();
        cache.put(2, "b2".to_string()).unwrap();
        assert_eq!(cache.get(&2).as_deref(), Some("b2"));
    }

    #[test]
    fn test_capacity_frees_after_delete() {
        let cache = small_cache(1, 60_000);
        cache.put(1, "a".to_string()).unwrap();
        assert!(cache.put(2, "b".to_string()).is_err());
        cache.delete(&1);
        cache.put(2, "b".to_string()).unwrap();
    }

    #[test]
    fn test_expiry_boundary() {
        let cache = small_cache(4, 100);
        cache.put(1, "a".to_string()).unwrap();
        assert!(cache.get(&1).is_some());

        thread::sleep(Duration::from_millis(150));
        assert!(cache.get(&1).is_none());
        // Lazily removed by the read above
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn test_get_does_not_refresh_ttl() {
        let cache = small_cache(4, 200);
        cache.put(1, "a".to_string()).unwrap();

        thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&1).is_some());

        // A sliding window would keep the entry alive here
        thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn test_put_refreshes_ttl() {
        let cache = small_cache(4, 200);
        cache.put(1, "a".to_string()).unwrap();
        thread::sleep(Duration::from_millis(120));
        cache.put(1, "a".to_string()).unwrap();
        thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&1).is_some());
    }

    #[test]
    fn test_full_cache_purges_expired_before_rejecting() {
        let cache = small_cache(2, 100);
        cache.put(1, "A".to_string()).unwrap();
        cache.put(2, "B".to_string()).unwrap();
        assert_eq!(cache.count(), 2);

        assert!(matches!(
            cache.put(3, "C".to_string()),
            Err(BlobFsError::CapacityExceeded { .. })
        ));

        thread::sleep(Duration::from_millis(150));
        cache.put(3, "C".to_string()).unwrap();

        assert_eq!(cache.count(), 1);
        assert!(cache.get(&1).is_none());
        assert!(cache.get(&2).is_none());
        assert_eq!(cache.get(&3).as_deref(), Some("C"));
    }

    #[test]
    fn test_count_includes_unreclaimed_expired() {
        let cache = small_cache(4, 50);
        cache.put(1, "a".to_string()).unwrap();
        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.count(), 1);
        let stats = cache.stats();
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.live_entries, 0);
    }

    #[test]
    fn test_cache_purge_expired() {
        let cache = small_cache(4, 50);
        cache.put(1, "a".to_string()).unwrap();
        thread::sleep(Duration::from_millis(80));
        cache.put(2, "b".to_string()).unwrap();

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.count(), 1);
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn test_snapshot_skips_expired() {
        let cache = small_cache(4, 50);
        cache.put(1, "old".to_string()).unwrap();
        thread::sleep(Duration::from_millis(80));
        cache.put(2, "fresh".to_string()).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot, vec![(2, "fresh".to_string())]);
        // Snapshots never reclaim
        assert_eq!(cache.count(), 2);
    }

    #[test]
    fn test_cache_stats() {
        let cache = small_cache(10, 60_000);
        cache.put(1, "a".to_string()).unwrap();
        cache.put(2, "b".to_string()).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.live_entries, 2);
        assert_eq!(stats.capacity, 10);
    }

    #[test]
    fn test_concurrent_put_same_key() {
        let cache = Arc::new(small_cache(4, 60_000));

        let handles: Vec<_> = ["first", "second"]
            .into_iter()
            .map(|value| {
                let cache = cache.clone();
                thread::spawn(move || cache.put(7, value.to_string()).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let value = cache.get(&7).unwrap();
        assert!(value == "first" || value == "second");
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_concurrent_inserts_respect_capacity() {
        let cache = Arc::new(small_cache(16, 60_000));

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    (0..32u64)
                        .filter(|i| cache.put(t * 100 + i, format!("{t}:{i}")).is_ok())
                        .count()
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(accepted, 16);
        assert_eq!(cache.count(), 16);
    }

    #[test]
    fn test_config_serializes() {
        let config = CacheConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Put(u64),
            Delete(u64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u64..12).prop_map(Op::Put),
                (0u64..12).prop_map(Op::Delete),
            ]
        }

        proptest! {
            #[test]
            fn count_never_exceeds_capacity(ops in prop::collection::vec(op(), 1..200)) {
                let cache = small_cache(5, 60_000);
                for op in ops {
                    match op {
                        Op::Put(key) => {
                            let existed = cache.get(&key).is_some();
                            let result = cache.put(key, key.to_string());
                            if existed {
                                prop_assert!(result.is_ok());
                            }
                        }
                        Op::Delete(key) => cache.delete(&key),
                    }
                    prop_assert!(cache.count() <= 5);
                }
            }
        }
    }
}
