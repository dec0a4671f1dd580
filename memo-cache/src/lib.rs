//! # MEMO Cache
//!
//! Memoization for callback-style async functions.
//!
//! A [`Cache`] owns one bounded store and one set of [`CacheStats`]. Wrapping
//! a function produces a [`Wrapped`] with the same calling convention that
//! looks up a depth-bounded fingerprint of the call before delegating:
//!
//! - **hit**: the completion fires immediately with the stored result
//! - **miss**: the original runs; a successful result is stored, errors are not
//!
//! ## Example
//!
//! ```rust
//! use memo_cache::{Cache, Completion};
//! use memo_core::MemoError;
//! use serde_json::{json, Value};
//!
//! let cache: Cache<String> = Cache::new();
//! let lookup = cache.wrap_named("lookup", |args: Vec<Value>, done: Completion<String, MemoError>| {
//!     done(Ok(Some(format!("user-{}", args[0]))))
//! });
//!
//! lookup.invoke(vec![json!(42)], Box::new(|r| assert_eq!(r.unwrap().as_deref(), Some("user-42"))));
//! lookup.invoke(vec![json!(42)], Box::new(|_| {}));
//! assert_eq!(cache.stats().hits(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

mod cache;
pub mod keygen;
mod stats;
mod wrap;

pub use cache::Cache;
pub use keygen::{cache_key, canonical_form};
pub use stats::{hitrate, CacheStats, StatsSnapshot};
pub use wrap::{Arg, CallbackFn, Completion, Wrapped};

// Store configuration is part of this crate's constructor surface
pub use memo_store::StoreConfig;
