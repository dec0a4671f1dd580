//! A cache instance: one bounded store, one set of stats.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use memo_core::error::{MemoError, Result};
use memo_core::traits::BoundedStore;
use memo_core::types::{CacheKey, FnIdentity, StoredValue};
use memo_store::{LruStore, StoreConfig};

use crate::stats::CacheStats;
use crate::wrap::{Completion, Wrapped};

/// Memoizing cache for a group of callback-style functions.
///
/// Every function wrapped by the same cache shares its store and stats;
/// keys include the function identity, so results never cross functions.
pub struct Cache<V> {
    store: Arc<dyn BoundedStore<V>>,
    stats: Arc<CacheStats>,
    anon_fn_id: AtomicU64,
}

impl<V: Clone + Send + 'static> Cache<V> {
    /// Creates a cache backed by an LRU store with default limits.
    pub fn new() -> Self {
        Self::with_store(LruStore::new())
    }

    /// Creates a cache backed by an LRU store with custom limits.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        Ok(Self::with_store(LruStore::with_config(config)?))
    }

    /// Creates a cache over any bounded store.
    pub fn with_store(store: impl BoundedStore<V> + 'static) -> Self {
        Self {
            store: Arc::new(store),
            stats: Arc::new(CacheStats::new()),
            anon_fn_id: AtomicU64::new(0),
        }
    }

    fn next_anon_id(&self) -> u64 {
        self.anon_fn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Wraps a context-free function.
    ///
    /// Function items are keyed by their path; closures get the next
    /// anonymous id of this cache.
    pub fn wrap<F, E>(&self, f: F) -> Wrapped<(), V, E>
    where
        F: Fn(Vec<Value>, Completion<V, E>) + Send + Sync + 'static,
        E: From<MemoError> + Send + 'static,
    {
        let identity = FnIdentity::of::<F>(|| self.next_anon_id());
        self.wrap_as(identity, move |_: &(), args, done| f(args, done), None)
    }

    /// Wraps a context-free function under an explicit name.
    pub fn wrap_named<F, E>(&self, name: impl Into<String>, f: F) -> Wrapped<(), V, E>
    where
        F: Fn(Vec<Value>, Completion<V, E>) + Send + Sync + 'static,
        E: From<MemoError> + Send + 'static,
    {
        self.wrap_as(
            FnIdentity::named(name),
            move |_: &(), args, done| f(args, done),
            None,
        )
    }

    /// Wraps a function that receives a context.
    ///
    /// With `bound` set every call runs against it; otherwise each call uses
    /// the context passed at the call site.
    pub fn wrap_with_context<C, F, E>(&self, f: F, bound: Option<Arc<C>>) -> Wrapped<C, V, E>
    where
        C: Send + Sync + 'static,
        F: Fn(&C, Vec<Value>, Completion<V, E>) + Send + Sync + 'static,
        E: From<MemoError> + Send + 'static,
    {
        let identity = FnIdentity::of::<F>(|| self.next_anon_id());
        self.wrap_as(identity, f, bound)
    }

    fn wrap_as<C, F, E>(&self, identity: FnIdentity, f: F, bound: Option<Arc<C>>) -> Wrapped<C, V, E>
    where
        C: Send + Sync + 'static,
        F: Fn(&C, Vec<Value>, Completion<V, E>) + Send + Sync + 'static,
        E: From<MemoError> + Send + 'static,
    {
        Wrapped::new(
            identity,
            Box::new(f),
            bound,
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
        )
    }

    /// Drops the entry `wrapped` would serve for `args`.
    ///
    /// Returns false without touching the store when `wrapped` belongs to a
    /// different cache.
    pub fn invalidate<C, E>(&self, wrapped: &Wrapped<C, V, E>, args: &[Value]) -> bool
    where
        C: Send + Sync + 'static,
        E: From<MemoError> + Send + 'static,
    {
        if !wrapped.uses_store(&self.store) {
            debug!(identity = %wrapped.identity(), "Invalidate called on a foreign cache");
            return false;
        }
        wrapped.invalidate(args)
    }

    /// Stored keys, most recently used first, if the store can enumerate.
    pub fn keys(&self) -> Option<Vec<CacheKey>> {
        self.store.keys()
    }

    /// Stored values, most recently used first, if the store can enumerate.
    pub fn values(&self) -> Option<Vec<StoredValue<V>>> {
        self.store.values()
    }

    /// Empties the store and counts one reset.
    pub fn flush(&self) {
        self.store.reset();
        self.stats.record_reset();
        info!(resets = self.stats.resets(), "Cache flushed");
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn BoundedStore<V>> {
        &self.store
    }

    /// The cache's counters.
    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }
}

impl<V: Clone + Send + 'static> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("keycount", &self.store.keycount())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
