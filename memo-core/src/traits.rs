//! Common traits for MEMO.
//!
//! The wrapper only ever talks to a store through [`BoundedStore`], so the
//! eviction policy can be swapped without touching the memoization logic.

use crate::error::Result;
use crate::types::{CacheKey, StoredValue};

// ═══════════════════════════════════════════════════════════════════════════════
// BOUNDED STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for a capacity/TTL limited key-value store.
///
/// Implementations might use:
/// - LRU eviction with optional TTL (the default `memo-store` backend)
/// - A fixed-size map for testing
///
/// All methods take `&self`; implementations provide their own locking.
pub trait BoundedStore<V>: Send + Sync {
    /// Looks up a key, refreshing its recency.
    ///
    /// Returns `None` when the key is not stored or has expired.
    fn get(&self, key: &CacheKey) -> Option<StoredValue<V>>;

    /// Stores a value, evicting older entries as needed.
    ///
    /// # Errors
    /// Returns `MemoError::Store` when the backend cannot accept the value.
    fn set(&self, key: CacheKey, value: StoredValue<V>) -> Result<()>;

    /// Removes a single key. Returns true if an entry was removed.
    fn remove(&self, key: &CacheKey) -> bool;

    /// Drops every entry.
    fn reset(&self);

    /// Weighted usage (equal to `keycount` when no size function is set).
    fn size(&self) -> usize;

    /// Number of entries currently held.
    fn keycount(&self) -> usize;

    /// Stored keys, most recently used first, when the backend can enumerate.
    fn keys(&self) -> Option<Vec<CacheKey>> {
        None
    }

    /// Stored values, most recently used first, when the backend can enumerate.
    fn values(&self) -> Option<Vec<StoredValue<V>>> {
        None
    }
}
