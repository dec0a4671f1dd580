//! Constants for MEMO key derivation and store defaults.

// ═══════════════════════════════════════════════════════════════════════════════
// KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Nesting depth inspected when fingerprinting arguments.
///
/// The root `{f, a}` record is depth 0, the argument list depth 1 and each
/// argument depth 2. Containers reached at this depth are collapsed, so two
/// argument trees that only differ below it produce the same key.
pub const KEY_DEPTH: usize = 4;

/// Size of a cache key fingerprint in bytes.
pub const CACHE_KEY_SIZE: usize = 32;

/// Domain separator for cache key derivation.
pub const DOMAIN_CACHE_KEY: &[u8] = b"MEMO_CACHE_KEY_V1";

/// Marker rendered in place of a collapsed container.
pub const COLLAPSED_MARKER: &str = "~";

// ═══════════════════════════════════════════════════════════════════════════════
// STORE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Entry limit applied when a store is configured with no limit at all.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// DEBUG REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix for auto-generated registry names.
pub const ANON_CACHE_PREFIX: &str = "anon_";
