//! Error types for MEMO.
//!
//! A single error hierarchy built with `thiserror`. Errors raised by the
//! functions a cache wraps never pass through this type: they are forwarded
//! to the caller exactly as produced.

use thiserror::Error;

/// Result type alias using `MemoError`.
pub type Result<T> = std::result::Result<T, MemoError>;

/// Main error type for all MEMO operations.
#[derive(Debug, Error)]
pub enum MemoError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CALL CONTRACT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The call did not match the wrapped function's shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The wrapped function dropped its completion without firing it.
    #[error("Completion for '{0}' was dropped without a result")]
    Abandoned(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The bounded store failed to accept or produce a value.
    #[error("Store error: {0}")]
    Store(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION & SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error while writing a debug dump.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MemoError {
    /// Returns true if the caller broke the call contract (never retried).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            MemoError::InvalidArgument(_) | MemoError::Abandoned(_)
        )
    }

    /// Returns true if this error originated in the bounded store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, MemoError::Store(_))
    }
}
