//! The view the registry has of a cache.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use memo_cache::{Cache, StatsSnapshot};

/// What the debug registry needs from a registered cache.
///
/// Every cache exposes its store and its stats through this one contract, so
/// snapshots never depend on how a particular cache names its fields.
pub trait Inspect: Send + Sync {
    /// Weighted store usage.
    fn size(&self) -> usize;

    /// Number of stored entries.
    fn keycount(&self) -> usize;

    /// Current counters.
    fn stats(&self) -> StatsSnapshot;

    /// Stored values as JSON, if the store can enumerate them.
    fn values(&self) -> Option<Vec<Value>>;

    /// Empties the store and counts one reset.
    fn flush(&self);
}

impl<V> Inspect for Cache<V>
where
    V: Clone + Send + Serialize + 'static,
{
    fn size(&self) -> usize {
        self.store().size()
    }

    fn keycount(&self) -> usize {
        self.store().keycount()
    }

    fn stats(&self) -> StatsSnapshot {
        Cache::stats(self).snapshot()
    }

    fn values(&self) -> Option<Vec<Value>> {
        let values = self.store().values()?;
        Some(
            values
                .iter()
                .map(|v| {
                    serde_json::to_value(v).unwrap_or_else(|e| {
                        warn!(error = %e, "Stored value is not representable as JSON");
                        Value::Null
                    })
                })
                .collect(),
        )
    }

    fn flush(&self) {
        Cache::flush(self)
    }
}
