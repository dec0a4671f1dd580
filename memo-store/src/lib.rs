//! Bounded store for MEMO caches.
//!
//! Least-recently-used eviction with optional entry limit, weighted size
//! limit, and per-entry time-to-live.

mod store;

pub use store::{LruStore, StoreConfig, StoreStats};
