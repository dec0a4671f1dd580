//! Cache-aware wrappers around callback-style functions.
//!
//! A wrapped function keeps the calling convention of the original: the
//! positional arguments come first and the last argument is a completion that
//! receives `Result<Option<V>, E>`. On a hit the completion fires before the
//! call returns; on a miss it fires whenever the original function fires its
//! own completion.

use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use serde_json::Value;
use tracing::{debug, trace, warn};

use memo_core::error::MemoError;
use memo_core::traits::BoundedStore;
use memo_core::types::{CacheKey, FnIdentity, StoredValue};

use crate::keygen::cache_key;
use crate::stats::CacheStats;

/// Completion handed to a callback-style function.
pub type Completion<V, E> = Box<dyn FnOnce(Result<Option<V>, E>) + Send + 'static>;

/// Shape of the functions a cache can wrap: context, arguments, completion.
pub type CallbackFn<C, V, E> = dyn Fn(&C, Vec<Value>, Completion<V, E>) + Send + Sync;

/// One argument of a dynamically shaped call.
pub enum Arg<V, E> {
    /// A positional value.
    Value(Value),
    /// The completion; only valid in last position.
    Completion(Completion<V, E>),
}

impl<V, E> Arg<V, E> {
    /// Positional argument.
    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }

    /// Completion argument.
    pub fn completion(done: impl FnOnce(Result<Option<V>, E>) + Send + 'static) -> Self {
        Arg::Completion(Box::new(done))
    }

    /// Returns true if this argument can complete a call.
    pub fn is_completion(&self) -> bool {
        matches!(self, Arg::Completion(_))
    }
}

impl<V, E> fmt::Debug for Arg<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Completion(_) => f.write_str("Completion(..)"),
        }
    }
}

struct WrappedInner<C, V, E> {
    identity: FnIdentity,
    original: Box<CallbackFn<C, V, E>>,
    bound: Option<Arc<C>>,
    store: Arc<dyn BoundedStore<V>>,
    stats: Arc<CacheStats>,
}

/// Cache-aware replacement for a callback-style function.
///
/// Cheap to clone; clones share the same identity and cache.
pub struct Wrapped<C, V, E> {
    inner: Arc<WrappedInner<C, V, E>>,
}

impl<C, V, E> Clone for Wrapped<C, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, V, E> fmt::Debug for Wrapped<C, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("identity", &self.inner.identity)
            .field("bound", &self.inner.bound.is_some())
            .finish()
    }
}

impl<C, V, E> Wrapped<C, V, E>
where
    C: Send + Sync + 'static,
    V: Clone + Send + 'static,
    E: From<MemoError> + Send + 'static,
{
    pub(crate) fn new(
        identity: FnIdentity,
        original: Box<CallbackFn<C, V, E>>,
        bound: Option<Arc<C>>,
        store: Arc<dyn BoundedStore<V>>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            inner: Arc::new(WrappedInner {
                identity,
                original,
                bound,
                store,
                stats,
            }),
        }
    }

    /// Identity this function contributes to its keys.
    pub fn identity(&self) -> &FnIdentity {
        &self.inner.identity
    }

    /// Key a call with `args` would be stored under.
    pub fn key_for(&self, args: &[Value]) -> CacheKey {
        cache_key(&self.inner.identity, args)
    }

    /// Returns true if this function stores its results in `store`.
    pub(crate) fn uses_store(&self, store: &Arc<dyn BoundedStore<V>>) -> bool {
        Arc::ptr_eq(&self.inner.store, store)
    }

    /// Drops the cached result for `args`, if any.
    ///
    /// Returns true if an entry was removed. Stats are left untouched.
    pub fn invalidate(&self, args: &[Value]) -> bool {
        let key = self.key_for(args);
        let removed = self.inner.store.remove(&key);
        debug!(identity = %self.inner.identity, ?key, removed, "Invalidated cache entry");
        removed
    }

    /// Calls through the cache with a call-site context.
    ///
    /// A context bound at wrap time takes precedence over `site`.
    pub fn invoke_with(&self, site: &C, args: Vec<Value>, done: Completion<V, E>) {
        let inner = &*self.inner;
        let ctx = inner.bound.as_deref().unwrap_or(site);
        let key = cache_key(&inner.identity, &args);

        if let Some(stored) = inner.store.get(&key) {
            inner.stats.record_hit();
            trace!(identity = %inner.identity, ?key, "Cache hit");
            done(Ok(stored.into_option()));
            return;
        }

        inner.stats.record_miss();
        debug!(identity = %inner.identity, ?key, "Cache miss");

        let pending = inner.stats.track_pending();
        let store = Arc::clone(&inner.store);
        let identity = inner.identity.clone();
        let substitute: Completion<V, E> = Box::new(move |result| {
            drop(pending);
            match result {
                Ok(value) => match store.set(key, StoredValue::from_option(value.clone())) {
                    Ok(()) => done(Ok(value)),
                    Err(err) => {
                        warn!(identity = %identity, ?key, error = %err, "Failed to store result");
                        done(Err(E::from(err)))
                    }
                },
                // Failures are never cached
                Err(err) => done(Err(err)),
            }
        });

        (inner.original)(ctx, args, substitute);
    }

    /// Dynamically shaped call: positional values followed by a completion.
    ///
    /// # Errors
    /// Returns `MemoError::InvalidArgument` if the last argument is not a
    /// completion or a completion appears anywhere else. Nothing is looked
    /// up, stored, or counted in that case.
    pub fn call_with(&self, site: &C, mut args: Vec<Arg<V, E>>) -> memo_core::Result<()> {
        let done = match args.pop() {
            Some(Arg::Completion(done)) => done,
            _ => {
                return Err(MemoError::InvalidArgument(format!(
                    "last argument to {} should be a completion",
                    self.inner.identity
                )))
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Value(v) => values.push(v),
                Arg::Completion(_) => {
                    return Err(MemoError::InvalidArgument(format!(
                        "{} takes a single completion in last position",
                        self.inner.identity
                    )))
                }
            }
        }

        self.invoke_with(site, values, done);
        Ok(())
    }

    /// Awaits the result of a call with a call-site context.
    ///
    /// Resolves to `MemoError::Abandoned` (converted into `E`) if the
    /// original function drops its completion without firing it.
    pub async fn call_async_with(&self, site: &C, args: Vec<Value>) -> Result<Option<V>, E> {
        let (tx, rx) = oneshot::channel();
        self.invoke_with(
            site,
            args,
            Box::new(move |result| {
                // Receiver gone means the caller stopped waiting
                let _ = tx.send(result);
            }),
        );
        match rx.await {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(E::from(MemoError::Abandoned(
                self.inner.identity.to_string(),
            ))),
        }
    }
}

impl<V, E> Wrapped<(), V, E>
where
    V: Clone + Send + 'static,
    E: From<MemoError> + Send + 'static,
{
    /// Calls through the cache.
    pub fn invoke(&self, args: Vec<Value>, done: Completion<V, E>) {
        self.invoke_with(&(), args, done)
    }

    /// Dynamically shaped call; see [`Wrapped::call_with`].
    pub fn call(&self, args: Vec<Arg<V, E>>) -> memo_core::Result<()> {
        self.call_with(&(), args)
    }

    /// Awaits the result of a call; see [`Wrapped::call_async_with`].
    pub async fn call_async(&self, args: Vec<Value>) -> Result<Option<V>, E> {
        self.call_async_with(&(), args).await
    }
}
