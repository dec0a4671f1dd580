//! Name → cache directory with snapshot, detail, and flush.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, info, instrument};

use memo_core::constants::ANON_CACHE_PREFIX;
use memo_core::error::Result;

use crate::inspect::Inspect;
use crate::snapshot::{CacheReport, ProcessInfo, Snapshot, ViewQuery};

static GLOBAL: OnceLock<Arc<DebugRegistry>> = OnceLock::new();

/// Directory of named caches for operational debugging.
///
/// Use [`DebugRegistry::global`] for the process-wide default, or construct
/// one and pass it around where a narrower lifetime is wanted.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
pub struct DebugRegistry {
    caches: DashMap<String, Arc<dyn Inspect>>,
    next_anon: AtomicU64,
    process: ProcessInfo,
}

impl DebugRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            caches: DashMap::new(),
            next_anon: AtomicU64::new(0),
            process: ProcessInfo::current(),
        }
    }

    /// Process-wide registry, created on first use and never dropped.
    pub fn global() -> Arc<DebugRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(DebugRegistry::new())))
    }

    /// Registers `cache` under `name`, or under `anon_<N>` when unnamed.
    ///
    /// An existing entry with the same name is replaced. Returns the cache
    /// unchanged so registration can wrap construction.
    pub fn register<T: Inspect + 'static>(&self, cache: Arc<T>, name: Option<&str>) -> Arc<T> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!(
                "{}{}",
                ANON_CACHE_PREFIX,
                self.next_anon.fetch_add(1, Ordering::Relaxed)
            ),
        };
        let replaced = self.caches.insert(name.clone(), cache.clone()).is_some();
        debug!(name = %name, replaced, "Registered cache");
        cache
    }

    /// Removes a cache. Returns true if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Builds a snapshot of every registered cache.
    ///
    /// `detail=<name>` adds that cache's stored values when its store can
    /// enumerate them. Otherwise, on a mutating request, `flush=<name>`
    /// empties that cache; its row shows the size and keycount that were
    /// discarded along with the new reset count.
    #[instrument(skip(self), fields(detail = ?query.detail, flush = ?query.flush))]
    pub fn view(&self, query: &ViewQuery) -> Snapshot {
        // Clone handles out of the map so no shard lock is held while flushing
        let mut entries: Vec<(String, Arc<dyn Inspect>)> = self
            .caches
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let data = entries
            .into_iter()
            .map(|(name, cache)| {
                let wants_detail = query.detail.as_deref() == Some(name.as_str());
                let values = if wants_detail { cache.values() } else { None };
                let size = cache.size();
                let keycount = cache.keycount();

                if values.is_none()
                    && query.method.is_mutating()
                    && query.flush.as_deref() == Some(name.as_str())
                {
                    cache.flush();
                    info!(name = %name, keycount, "Flushed cache from debug request");
                }

                let stats = cache.stats();
                CacheReport {
                    size,
                    keycount,
                    hitrate: stats.hitrate,
                    resets: stats.reset,
                    pending: stats.pending,
                    values,
                    name,
                }
            })
            .collect();

        Snapshot {
            pid: self.process.pid,
            uptime: self.process.uptime(),
            host: self.process.host.clone(),
            data,
        }
    }

    /// Writes a snapshot as one JSON line to stderr.
    pub fn log(&self) -> Result<()> {
        self.log_to(std::io::stderr().lock())
    }

    /// Writes a snapshot as one JSON line to `sink`.
    pub fn log_to<W: Write>(&self, mut sink: W) -> Result<()> {
        let snapshot = self.view(&ViewQuery::default());
        serde_json::to_writer(&mut sink, &snapshot)?;
        writeln!(sink)?;
        sink.flush()?;
        Ok(())
    }
}

impl Default for DebugRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DebugRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugRegistry")
            .field("caches", &self.names())
            .field("pid", &self.process.pid)
            .finish()
    }
}
