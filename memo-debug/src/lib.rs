//! # MEMO Debug
//!
//! A registry of named caches for operational debugging.
//!
//! Register caches as they are built, then expose [`DebugRegistry::view`]
//! over HTTP or dump [`DebugRegistry::log`] from a signal handler:
//!
//! ```rust
//! use std::sync::Arc;
//! use memo_cache::Cache;
//! use memo_debug::{DebugRegistry, ViewQuery};
//!
//! let registry = DebugRegistry::new();
//! let users = registry.register(Arc::new(Cache::<String>::new()), Some("users"));
//!
//! let snapshot = registry.view(&ViewQuery::default());
//! assert_eq!(snapshot.data[0].name, "users");
//! assert_eq!(users.stats().hits(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

mod inspect;
mod registry;
mod snapshot;

pub use inspect::Inspect;
pub use registry::DebugRegistry;
pub use snapshot::{CacheReport, ProcessInfo, RequestMethod, Snapshot, ViewQuery};
