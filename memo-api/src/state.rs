//! App state: registry handle and server config.

use std::net::SocketAddr;
use std::sync::Arc;

use memo_debug::DebugRegistry;

/// Route prefix used when `MEMO_DEBUG_PATH` is unset.
pub const DEFAULT_DEBUG_PATH: &str = "/debug/caches";

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3030);

/// Debug server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Path serving snapshots and flushes
    pub debug_path: String,
    /// Listen address
    pub bind: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            debug_path: DEFAULT_DEBUG_PATH.into(),
            bind: DEFAULT_BIND.into(),
        }
    }
}

impl ApiConfig {
    /// Reads `MEMO_DEBUG_PATH` and `MEMO_BIND`, loading `.env` if present.
    ///
    /// Unparseable or unset values fall back to the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            debug_path: std::env::var("MEMO_DEBUG_PATH")
                .ok()
                .map(|p| normalize_path(&p))
                .unwrap_or(defaults.debug_path),
            bind: std::env::var("MEMO_BIND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind),
        }
    }

    /// Sets the debug path.
    pub fn with_debug_path(mut self, path: &str) -> Self {
        self.debug_path = normalize_path(path);
        self
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_DEBUG_PATH.into()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Shared handler state.
pub struct AppState {
    /// Server configuration
    pub config: ApiConfig,
    /// Registry the routes read and flush
    pub registry: Arc<DebugRegistry>,
}

impl AppState {
    /// Creates state over `registry`.
    pub fn new(config: ApiConfig, registry: Arc<DebugRegistry>) -> Self {
        Self { config, registry }
    }
}
