//! # MEMO Core
//!
//! Core types, errors, and traits shared by every MEMO crate.
//!
//! - **Types**: cache keys, function identities, and the stored-value union
//! - **Errors**: one error enum with classification helpers
//! - **Constants**: key derivation depth, domain separators, store defaults
//! - **Traits**: the [`BoundedStore`] contract consumed by the wrapper
//!
//! ## Example
//!
//! ```rust
//! use memo_core::{FnIdentity, StoredValue};
//!
//! let identity = FnIdentity::named("load_user");
//! assert_eq!(identity.to_string(), "load_user");
//!
//! let cached: StoredValue<u32> = StoredValue::from_option(None);
//! assert_eq!(cached.into_option(), None);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{MemoError, Result};
pub use traits::*;
pub use types::*;
