//! In-memory LRU store with TTL.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use memo_core::constants::DEFAULT_MAX_ENTRIES;
use memo_core::error::{MemoError, Result};
use memo_core::traits::BoundedStore;
use memo_core::types::{CacheKey, StoredValue};

/// Store entry with optional TTL.
#[derive(Clone)]
struct StoreEntry<V> {
    value: StoredValue<V>,
    inserted_at: Instant,
    ttl: Option<Duration>,
    weight: usize,
}

impl<V> StoreEntry<V> {
    fn is_expired(&self) -> bool {
        self.ttl.map_or(false, |ttl| self.inserted_at.elapsed() > ttl)
    }
}

/// Store configuration.
///
/// When none of `max_entries`, `max_size` or `ttl_seconds` is set the store
/// falls back to `DEFAULT_MAX_ENTRIES` entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entries
    pub max_entries: Option<usize>,
    /// Maximum total weight, as measured by the store's size function
    pub max_size: Option<usize>,
    /// Default TTL in seconds
    pub ttl_seconds: Option<u64>,
    /// Whether to purge expired entries before evicting live ones
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
}

fn default_auto_cleanup() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            max_size: None,
            ttl_seconds: None,
            auto_cleanup: true,
        }
    }
}

impl StoreConfig {
    /// Entry-limited configuration.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::default()
        }
    }

    /// Sets the default TTL.
    pub fn ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    /// Sets the weighted size limit.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Fills in the default entry limit and rejects zero limits.
    fn resolve(mut self) -> Result<Self> {
        if self.max_entries.is_none() && self.max_size.is_none() && self.ttl_seconds.is_none() {
            self.max_entries = Some(DEFAULT_MAX_ENTRIES);
        }
        if self.max_entries == Some(0) {
            return Err(MemoError::ConfigError("max_entries must be at least 1".into()));
        }
        if self.max_size == Some(0) {
            return Err(MemoError::ConfigError("max_size must be at least 1".into()));
        }
        Ok(self)
    }
}

type Sizer<V> = Arc<dyn Fn(&V) -> usize + Send + Sync>;

struct Inner<V> {
    entries: LruCache<CacheKey, StoreEntry<V>>,
    weight: usize,
}

impl<V> Inner<V> {
    fn pop(&mut self, key: &CacheKey) -> Option<StoreEntry<V>> {
        let entry = self.entries.pop(key)?;
        self.weight = self.weight.saturating_sub(entry.weight);
        Some(entry)
    }

    fn pop_lru(&mut self) -> Option<(CacheKey, StoreEntry<V>)> {
        let (key, entry) = self.entries.pop_lru()?;
        self.weight = self.weight.saturating_sub(entry.weight);
        Some((key, entry))
    }

    fn purge_expired(&mut self) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            self.pop(key);
        }
        expired.len()
    }
}

/// In-memory bounded store.
///
/// Thread-safe; every operation takes the internal lock once and never calls
/// out to user code while holding it.
pub struct LruStore<V> {
    inner: Mutex<Inner<V>>,
    config: StoreConfig,
    sizer: Option<Sizer<V>>,
}

impl<V: Clone + Send + 'static> LruStore<V> {
    /// Creates a store holding up to `DEFAULT_MAX_ENTRIES` entries.
    pub fn new() -> Self {
        Self::build(StoreConfig::with_max_entries(DEFAULT_MAX_ENTRIES))
    }

    /// Creates a store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        Ok(Self::build(config.resolve()?))
    }

    fn build(config: StoreConfig) -> Self {
        let entries = match config.max_entries.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            inner: Mutex::new(Inner { entries, weight: 0 }),
            config,
            sizer: None,
        }
    }

    /// Weighs present values with `sizer` instead of counting them as 1.
    ///
    /// Ignored unless `max_size` is set.
    pub fn with_sizer(mut self, sizer: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        self.sizer = Some(Arc::new(sizer));
        self
    }

    /// Returns the effective configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn weigh(&self, value: &StoredValue<V>) -> usize {
        match (value, &self.sizer, self.config.max_size) {
            (StoredValue::Present(v), Some(sizer), Some(_)) => sizer(v).max(1),
            _ => 1,
        }
    }

    /// Stores a value with a custom TTL.
    pub fn set_with_ttl(&self, key: CacheKey, value: StoredValue<V>, ttl: Duration) {
        self.insert(key, value, Some(ttl));
    }

    fn insert(&self, key: CacheKey, value: StoredValue<V>, ttl: Option<Duration>) {
        let weight = self.weigh(&value);
        let mut inner = self.inner.lock();

        inner.pop(&key);

        if let Some(max_size) = self.config.max_size {
            if weight > max_size {
                debug!(?key, weight, max_size, "Value larger than store, not cached");
                return;
            }
        }

        // Prefer dropping dead entries over evicting live ones
        if self.config.auto_cleanup {
            let at_capacity = self
                .config
                .max_entries
                .map_or(false, |max| inner.entries.len() >= max);
            let over_size = self
                .config
                .max_size
                .map_or(false, |max| inner.weight.saturating_add(weight) > max);
            if at_capacity || over_size {
                let purged = inner.purge_expired();
                if purged > 0 {
                    trace!(purged, "Purged expired entries");
                }
            }
        }

        let entry = StoreEntry {
            value,
            inserted_at: Instant::now(),
            ttl,
            weight,
        };
        inner.weight = inner.weight.saturating_add(weight);
        if let Some((evicted_key, evicted)) = inner.entries.push(key, entry) {
            inner.weight = inner.weight.saturating_sub(evicted.weight);
            trace!(key = ?evicted_key, "Evicted least recently used entry");
        }

        if let Some(max_size) = self.config.max_size {
            while inner.weight > max_size {
                match inner.pop_lru() {
                    Some((evicted_key, _)) => {
                        trace!(key = ?evicted_key, "Evicted entry over size limit")
                    }
                    None => break,
                }
            }
        }
    }

    /// Removes all expired entries. Returns how many were dropped.
    pub fn purge_stale(&self) -> usize {
        self.inner.lock().purge_expired()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let expired = inner.entries.iter().filter(|(_, e)| e.is_expired()).count();
        StoreStats {
            total_entries: inner.entries.len(),
            expired_entries: expired,
            valid_entries: inner.entries.len().saturating_sub(expired),
            weight: inner.weight,
            capacity: self.config.max_entries,
        }
    }
}

impl<V: Clone + Send + 'static> Default for LruStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> BoundedStore<V> for LruStore<V> {
    fn get(&self, key: &CacheKey) -> Option<StoredValue<V>> {
        let mut inner = self.inner.lock();
        let expired = inner.entries.get(key)?.is_expired();
        if expired {
            inner.pop(key);
            return None;
        }
        inner.entries.peek(key).map(|e| e.value.clone())
    }

    fn set(&self, key: CacheKey, value: StoredValue<V>) -> Result<()> {
        let ttl = self.config.ttl_seconds.map(Duration::from_secs);
        self.insert(key, value, ttl);
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.weight = 0;
    }

    fn size(&self) -> usize {
        self.inner.lock().weight
    }

    fn keycount(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn keys(&self) -> Option<Vec<CacheKey>> {
        let inner = self.inner.lock();
        Some(
            inner
                .entries
                .iter()
                .filter(|(_, e)| !e.is_expired())
                .map(|(k, _)| *k)
                .collect(),
        )
    }

    fn values(&self) -> Option<Vec<StoredValue<V>>> {
        let inner = self.inner.lock();
        Some(
            inner
                .entries
                .iter()
                .filter(|(_, e)| !e.is_expired())
                .map(|(_, e)| e.value.clone())
                .collect(),
        )
    }
}

/// Store statistics.
#[derive(Clone, Debug)]
pub struct StoreStats {
    /// Entries held, expired or not
    pub total_entries: usize,
    /// Entries past their TTL and not yet purged
    pub expired_entries: usize,
    /// Entries still servable
    pub valid_entries: usize,
    /// Weighted usage
    pub weight: usize,
    /// Entry limit, if any
    pub capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> CacheKey {
        CacheKey::from_array([n; 32])
    }

    fn present(s: &str) -> StoredValue<String> {
        StoredValue::Present(s.to_string())
    }

    #[test]
    fn test_store_set_get() {
        let store = LruStore::new();
        store.set(key(1), present("alice")).unwrap();
        assert_eq!(store.get(&key(1)), Some(present("alice")));
    }

    #[test]
    fn test_store_miss() {
        let store: LruStore<String> = LruStore::new();
        assert!(store.get(&key(9)).is_none());
    }

    #[test]
    fn test_store_absent_is_not_a_miss() {
        let store: LruStore<String> = LruStore::new();
        store.set(key(1), StoredValue::Absent).unwrap();
        assert_eq!(store.get(&key(1)), Some(StoredValue::Absent));
    }

    #[test]
    fn test_store_remove() {
        let store = LruStore::new();
        store.set(key(1), present("alice")).unwrap();
        assert!(store.remove(&key(1)));
        assert!(!store.remove(&key(1)));
        assert!(store.get(&key(1)).is_none());
    }

    #[test]
    fn test_store_reset() {
        let store = LruStore::new();
        store.set(key(1), present("alice")).unwrap();
        store.set(key(2), present("bob")).unwrap();
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.keycount(), 0);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = LruStore::new();
        store.set_with_ttl(key(1), present("alice"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.keycount(), 0);
    }

    #[test]
    fn test_store_lru_eviction() {
        let store = LruStore::with_config(StoreConfig::with_max_entries(2)).unwrap();
        store.set(key(1), present("a")).unwrap();
        store.set(key(2), present("b")).unwrap();

        // Touch A so B becomes least recently used
        assert!(store.get(&key(1)).is_some());
        store.set(key(3), present("c")).unwrap();

        assert_eq!(store.keycount(), 2);
        assert!(store.get(&key(2)).is_none());
        assert!(store.get(&key(1)).is_some());
        assert!(store.get(&key(3)).is_some());
    }

    #[test]
    fn test_store_overwrite_keeps_count() {
        let store = LruStore::with_config(StoreConfig::with_max_entries(2)).unwrap();
        store.set(key(1), present("a")).unwrap();
        store.set(key(1), present("a2")).unwrap();
        assert_eq!(store.keycount(), 1);
        assert_eq!(store.size(), 1);
        assert_eq!(store.get(&key(1)), Some(present("a2")));
    }

    #[test]
    fn test_store_size_limit_with_sizer() {
        let config = StoreConfig::default().max_size(10);
        let store = LruStore::with_config(config)
            .unwrap()
            .with_sizer(|v: &String| v.len());

        store.set(key(1), present("aaaa")).unwrap();
        store.set(key(2), present("bbbb")).unwrap();
        assert_eq!(store.size(), 8);

        store.set(key(3), present("cccc")).unwrap();
        assert_eq!(store.keycount(), 2);
        assert!(store.size() <= 10);
        assert!(store.get(&key(1)).is_none());
    }

    #[test]
    fn test_store_oversized_value_not_cached() {
        let config = StoreConfig::default().max_size(3);
        let store = LruStore::with_config(config)
            .unwrap()
            .with_sizer(|v: &String| v.len());
        store.set(key(1), present("too long")).unwrap();
        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_store_default_limit_applied() {
        let store: LruStore<String> = LruStore::with_config(StoreConfig::default()).unwrap();
        assert_eq!(store.config().max_entries, Some(DEFAULT_MAX_ENTRIES));

        let ttl_only: LruStore<String> = LruStore::with_config(StoreConfig::default().ttl(60)).unwrap();
        assert_eq!(ttl_only.config().max_entries, None);
    }

    #[test]
    fn test_store_zero_limit_rejected() {
        let result: Result<LruStore<String>> = LruStore::with_config(StoreConfig::with_max_entries(0));
        assert!(matches!(result, Err(MemoError::ConfigError(_))));
    }

    #[test]
    fn test_store_values_enumerates_live_entries() {
        let store = LruStore::new();
        store.set(key(1), present("a")).unwrap();
        store.set_with_ttl(key(2), present("b"), Duration::from_millis(1));
        store.set(key(3), StoredValue::Absent).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        let values = store.values().unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&present("a")));
        assert!(values.contains(&StoredValue::Absent));
    }

    #[test]
    fn test_store_keys_most_recent_first() {
        let store = LruStore::new();
        store.set(key(1), present("a")).unwrap();
        store.set(key(2), present("b")).unwrap();
        store.set_with_ttl(key(3), present("c"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        // Touch 1 so it moves ahead of 2
        assert!(store.get(&key(1)).is_some());
        assert_eq!(store.keys().unwrap(), vec![key(1), key(2)]);
    }

    #[test]
    fn test_store_sizer_ignored_without_size_limit() {
        let store = LruStore::new().with_sizer(|_: &String| usize::MAX);
        store.set(key(1), present("a")).unwrap();
        store.set(key(2), present("b")).unwrap();
        assert_eq!(store.size(), 2);
        assert!(store.remove(&key(1)));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_store_huge_weights_do_not_overflow() {
        let config = StoreConfig::default().max_size(usize::MAX);
        let store = LruStore::with_config(config)
            .unwrap()
            .with_sizer(|v: &String| if v == "huge" { usize::MAX } else { 1 });
        store.set(key(1), present("small")).unwrap();
        store.set(key(2), present("huge")).unwrap();
        assert!(store.size() <= usize::MAX);
        assert!(store.get(&key(2)).is_some());
        store.reset();
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_store_purge_stale() {
        let store = LruStore::new();
        store.set_with_ttl(key(1), present("a"), Duration::from_millis(1));
        store.set(key(2), present("b")).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.purge_stale(), 1);
        assert_eq!(store.keycount(), 1);
        assert!(store.get(&key(2)).is_some());
    }

    #[test]
    fn test_store_stats() {
        let store = LruStore::new();
        store.set(key(1), present("a")).unwrap();
        store.set(key(2), present("b")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.capacity, Some(DEFAULT_MAX_ENTRIES));
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_entries": 5}"#).unwrap();
        assert_eq!(config.max_entries, Some(5));
        assert!(config.auto_cleanup);
        assert!(config.ttl_seconds.is_none());
    }
}
