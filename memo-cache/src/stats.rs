//! Per-cache hit/miss/reset/pending counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Hit rate as a whole percentage, `0` when nothing was recorded.
pub fn hitrate(hit: u64, miss: u64) -> u64 {
    let total = hit + miss;
    if total == 0 {
        0
    } else {
        hit * 100 / total
    }
}

/// Counters owned by one cache.
///
/// `pending` counts misses whose wrapped function has been entered and whose
/// completion has not been consumed yet.
#[derive(Debug, Default)]
pub struct CacheStats {
    hit: AtomicU64,
    miss: AtomicU64,
    reset: AtomicU64,
    pending: AtomicU64,
}

impl CacheStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hit.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.miss.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.reset.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks one call in flight until the returned guard drops.
    pub(crate) fn track_pending(self: &Arc<Self>) -> PendingGuard {
        self.pending.fetch_add(1, Ordering::Relaxed);
        PendingGuard {
            stats: Arc::clone(self),
        }
    }

    /// Lookups served from the store.
    pub fn hits(&self) -> u64 {
        self.hit.load(Ordering::Relaxed)
    }

    /// Lookups that fell through to the wrapped function.
    pub fn misses(&self) -> u64 {
        self.miss.load(Ordering::Relaxed)
    }

    /// Explicit flushes of the owning cache.
    pub fn resets(&self) -> u64 {
        self.reset.load(Ordering::Relaxed)
    }

    /// Misses still waiting on their completion.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Current hit rate percentage.
    pub fn hitrate(&self) -> u64 {
        hitrate(self.hits(), self.misses())
    }

    /// Copies the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let hit = self.hits();
        let miss = self.misses();
        StatsSnapshot {
            hit,
            miss,
            reset: self.resets(),
            pending: self.pending(),
            hitrate: hitrate(hit, miss),
        }
    }
}

/// Decrements `pending` on drop.
#[derive(Debug)]
pub(crate) struct PendingGuard {
    stats: Arc<CacheStats>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.stats.pending.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hit: u64,
    pub miss: u64,
    pub reset: u64,
    pub pending: u64,
    pub hitrate: u64,
}
