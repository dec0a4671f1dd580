//! Domain types for MEMO.
//!
//! - [`CacheKey`]: fixed-size fingerprint of a function identity and its arguments
//! - [`FnIdentity`]: the name (or anonymous id) a wrapped function is keyed under
//! - [`StoredValue`]: what a store holds for a key, distinguishing a cached
//!   "no value" result from a missing entry

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::CACHE_KEY_SIZE;
use crate::error::{MemoError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Deterministic fingerprint of `(identity, arguments)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    bytes: [u8; CACHE_KEY_SIZE],
}

impl CacheKey {
    /// Creates a key from a fixed-size array.
    pub fn from_array(bytes: [u8; CACHE_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    /// Returns error if the length doesn't match `CACHE_KEY_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; CACHE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            MemoError::InvalidArgument(format!(
                "cache key must be {} bytes, got {}",
                CACHE_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Returns the raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hex-encoded key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parses a hex-encoded key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| MemoError::InvalidArgument(format!("invalid cache key hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty to tell keys apart in logs
        write!(f, "CacheKey({}..)", hex::encode(&self.bytes[..8]))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for CacheKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FUNCTION IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity a wrapped function contributes to its cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FnIdentity {
    /// Declared or caller-supplied name.
    Named(String),
    /// Per-cache sequence number handed to unnamed functions.
    Anonymous(u64),
}

impl FnIdentity {
    /// Creates a named identity.
    pub fn named(name: impl Into<String>) -> Self {
        FnIdentity::Named(name.into())
    }

    /// Derives an identity from a callable's type.
    ///
    /// Function items carry their path (e.g. `app::users::load_user`), which
    /// is used as the name. Everything else (closures, `fn` pointers, boxed
    /// or borrowed trait objects, generic instantiations) names a type shared
    /// by many functions, so it gets `Anonymous(next_anon)` and the caller's
    /// counter should advance.
    pub fn of<F: ?Sized>(next_anon: impl FnOnce() -> u64) -> Self {
        let name = std::any::type_name::<F>();
        if is_item_path(name) {
            FnIdentity::Named(name.to_string())
        } else {
            FnIdentity::Anonymous(next_anon())
        }
    }

    /// Returns true for identities assigned to unnamed functions.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, FnIdentity::Anonymous(_))
    }
}

/// True for `a::b::c` where every segment is a plain identifier.
fn is_item_path(name: &str) -> bool {
    !name.is_empty()
        && name.split("::").all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        })
}

impl fmt::Display for FnIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnIdentity::Named(name) => f.write_str(name),
            FnIdentity::Anonymous(id) => write!(f, "{}", id),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORED VALUE
// ═══════════════════════════════════════════════════════════════════════════════

/// Value held by a store for a key.
///
/// `Absent` is a successfully cached `None` result. A store lookup that finds
/// nothing returns `Option::None` instead, so the two never get confused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredValue<V> {
    /// A real result.
    Present(V),
    /// A cached "no value" result.
    Absent,
}

impl<V> StoredValue<V> {
    /// Wraps a function result for storage.
    pub fn from_option(value: Option<V>) -> Self {
        match value {
            Some(v) => StoredValue::Present(v),
            None => StoredValue::Absent,
        }
    }

    /// Converts back to the result the wrapped function produced.
    pub fn into_option(self) -> Option<V> {
        match self {
            StoredValue::Present(v) => Some(v),
            StoredValue::Absent => None,
        }
    }

    /// Borrowing variant of [`StoredValue::into_option`].
    pub fn as_option(&self) -> Option<&V> {
        match self {
            StoredValue::Present(v) => Some(v),
            StoredValue::Absent => None,
        }
    }

    /// Returns true for a cached "no value" result.
    pub fn is_absent(&self) -> bool {
        matches!(self, StoredValue::Absent)
    }
}

impl<V> From<Option<V>> for StoredValue<V> {
    fn from(value: Option<V>) -> Self {
        Self::from_option(value)
    }
}

// Absent serializes as null, so the sentinel never shows up in debug dumps.
impl<V: Serialize> Serialize for StoredValue<V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_option().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_hex_roundtrip() {
        let key = CacheKey::from_array([7u8; CACHE_KEY_SIZE]);
        let parsed = CacheKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn test_cache_key_wrong_size() {
        assert!(CacheKey::from_bytes(&[1, 2, 3]).is_err());
        assert!(CacheKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_cache_key_debug_is_short() {
        let key = CacheKey::from_array([0xab; CACHE_KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "CacheKey(abababababababab..)");
    }

    fn identity_for<F>(_: &F, next: u64) -> FnIdentity {
        FnIdentity::of::<F>(|| next)
    }

    #[test]
    fn test_identity_of_fn_item_is_named() {
        fn load_user(id: u32) -> u32 {
            id
        }
        match identity_for(&load_user, 0) {
            FnIdentity::Named(name) => assert!(name.ends_with("load_user")),
            other => panic!("expected named identity, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_of_closure_is_anonymous() {
        let closure = |x: u32| x + 1;
        let identity = identity_for(&closure, 3);
        assert_eq!(identity, FnIdentity::Anonymous(3));
        assert!(identity.is_anonymous());
    }

    #[test]
    fn test_identity_of_fn_pointer_is_anonymous() {
        fn load_user(id: u32) -> u32 {
            id
        }
        fn load_order(id: u32) -> u32 {
            id + 1
        }
        let user: fn(u32) -> u32 = load_user;
        let order: fn(u32) -> u32 = load_order;
        assert_eq!(identity_for(&user, 0), FnIdentity::Anonymous(0));
        assert_eq!(identity_for(&order, 1), FnIdentity::Anonymous(1));
    }

    #[test]
    fn test_identity_of_trait_objects_is_anonymous() {
        let boxed: Box<dyn Fn(u32) -> u32> = Box::new(|x| x);
        let shared: std::sync::Arc<dyn Fn(u32) -> u32> = std::sync::Arc::new(|x| x);
        assert!(identity_for(&boxed, 0).is_anonymous());
        assert!(identity_for(&shared, 0).is_anonymous());
        assert!(FnIdentity::of::<dyn Fn(u32) -> u32>(|| 9).is_anonymous());
        assert!(FnIdentity::of::<&fn(u32) -> u32>(|| 9).is_anonymous());
    }

    #[test]
    fn test_item_path_detection() {
        assert!(is_item_path("app::users::load_user"));
        assert!(is_item_path("_private"));
        assert!(!is_item_path(""));
        assert!(!is_item_path("app::load<u32>"));
        assert!(!is_item_path("app::main::{{closure}}"));
        assert!(!is_item_path("fn(u32) -> u32"));
        assert!(!is_item_path("app::::x"));
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(FnIdentity::named("lookup").to_string(), "lookup");
        assert_eq!(FnIdentity::Anonymous(12).to_string(), "12");
    }

    #[test]
    fn test_stored_value_absent_roundtrip() {
        let stored: StoredValue<String> = StoredValue::from_option(None);
        assert!(stored.is_absent());
        assert_eq!(stored.into_option(), None);

        let stored = StoredValue::from_option(Some("x".to_string()));
        assert_eq!(stored.as_option().map(String::as_str), Some("x"));
    }

    #[test]
    fn test_stored_value_serializes_absent_as_null() {
        let absent: StoredValue<u32> = StoredValue::Absent;
        assert_eq!(serde_json::to_string(&absent).unwrap(), "null");
        assert_eq!(serde_json::to_string(&StoredValue::Present(5u32)).unwrap(), "5");
    }
}
