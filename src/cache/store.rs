//! Cache storage.
//!
//! Without a configured bound the store keeps every entry for the process
//! lifetime, so memory grows with the number of distinct builds served. A
//! positive `max_entries` switches to LRU eviction over both keyspaces.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT_TOTAL: &str = "modjulie_cache_evict_total";

enum Entries {
    Unbounded(HashMap<CacheKey, Arc<str>>),
    Bounded(LruCache<CacheKey, Arc<str>>),
}

/// Shared key/value store for header and build text.
pub struct CacheStore {
    entries: RwLock<Entries>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CacheStore {
    /// Create a store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = match config.capacity() {
            Some(capacity) => Entries::Bounded(LruCache::new(capacity)),
            None => Entries::Unbounded(HashMap::new()),
        };
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(&CacheConfig::default())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            if let Entries::Unbounded(map) = &*entries {
                return map.get(key).cloned();
            }
        }

        // LRU lookups update recency and need the write lock.
        match &mut *rw_write(&self.entries, SOURCE, "get.lru") {
            Entries::Bounded(lru) => lru.get(key).cloned(),
            Entries::Unbounded(map) => map.get(key).cloned(),
        }
    }

    /// Insert or overwrite an entry, returning the key evicted to make room.
    pub fn set(&self, key: CacheKey, value: Arc<str>) -> Option<CacheKey> {
        let evicted = match &mut *rw_write(&self.entries, SOURCE, "set") {
            Entries::Unbounded(map) => {
                map.insert(key, value);
                None
            }
            Entries::Bounded(lru) => lru
                .push(key.clone(), value)
                .and_then(|(old_key, _)| (old_key != key).then_some(old_key)),
        };

        if evicted.is_some() {
            counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
        }
        evicted
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        match &*rw_read(&self.entries, SOURCE, "contains") {
            Entries::Unbounded(map) => map.contains_key(key),
            Entries::Bounded(lru) => lru.contains(key),
        }
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> usize {
        match &*rw_read(&self.entries, SOURCE, "len") {
            Entries::Unbounded(map) => map.len(),
            Entries::Bounded(lru) => lru.len(),
        }
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::path::Path;

    use super::super::keys::{BuildKey, HeaderKey};
    use super::*;

    fn build_key(version: &str) -> CacheKey {
        CacheKey::Build(BuildKey::derive(version, "", &[]))
    }

    #[test]
    fn unbounded_store_roundtrip() {
        let store = CacheStore::unbounded();
        let key = build_key("v1");

        assert!(store.get(&key).is_none());
        assert!(store.set(key.clone(), Arc::from("bundle")).is_none());

        assert_eq!(store.get(&key).as_deref(), Some("bundle"));
        assert!(store.contains(&key));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overwrite_keeps_a_single_entry() {
        let store = CacheStore::unbounded();
        let key = build_key("v1");

        store.set(key.clone(), Arc::from("first"));
        store.set(key.clone(), Arc::from("second"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).as_deref(), Some("second"));
    }

    #[test]
    fn header_and_build_entries_do_not_collide() {
        let store = CacheStore::unbounded();
        let header = CacheKey::Header(HeaderKey::new(Path::new("v1")));
        let build = build_key("v1");

        store.set(header.clone(), Arc::from("headers"));
        store.set(build.clone(), Arc::from("bundle"));

        assert_eq!(store.get(&header).as_deref(), Some("headers"));
        assert_eq!(store.get(&build).as_deref(), Some("bundle"));
    }

    #[test]
    fn bounded_store_evicts_least_recently_used() {
        let config = CacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let store = CacheStore::new(&config);
        let (first, second, third) = (build_key("v1"), build_key("v2"), build_key("v3"));

        store.set(first.clone(), Arc::from("1"));
        store.set(second.clone(), Arc::from("2"));

        // Touch the first entry so the second becomes the eviction candidate.
        assert!(store.get(&first).is_some());

        let evicted = store.set(third.clone(), Arc::from("3"));
        assert_eq!(evicted, Some(second.clone()));
        assert!(store.contains(&first));
        assert!(!store.contains(&second));
        assert!(store.contains(&third));
    }

    #[test]
    fn bounded_overwrite_is_not_an_eviction() {
        let config = CacheConfig {
            max_entries: 1,
            ..Default::default()
        };
        let store = CacheStore::new(&config);
        let key = build_key("v1");

        store.set(key.clone(), Arc::from("a"));
        assert!(store.set(key.clone(), Arc::from("b")).is_none());
        assert_eq!(store.get(&key).as_deref(), Some("b"));
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = CacheStore::unbounded();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set(build_key("v1"), Arc::from("bundle"));
        assert!(store.get(&build_key("v1")).is_some());
    }
}
