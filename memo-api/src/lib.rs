//! # MEMO API Server
//!
//! HTTP and signal access to a [`DebugRegistry`].
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and registered cache count
//! - `GET <debug_path>` - Snapshot; `?detail=<name>` adds stored values
//! - `POST <debug_path>` - Snapshot; `?flush=<name>` empties that cache first
//! - `POST <debug_path>/log` - Writes one JSON snapshot line to stderr
//!
//! `debug_path` defaults to `/debug/caches` (`MEMO_DEBUG_PATH`).
//!
//! ## Example
//!
//! ```rust,ignore
//! use memo_api::{ApiConfig, ApiServer};
//! use memo_debug::DebugRegistry;
//!
//! let server = ApiServer::new(ApiConfig::from_env(), DebugRegistry::global());
//! server.run(([127, 0, 0, 1], 3030)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod error;
mod handlers;
mod routes;
#[cfg(unix)]
mod signal;
mod state;

pub use error::ApiError;
pub use routes::create_router;
#[cfg(unix)]
pub use signal::spawn_signal_dump;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use memo_debug::DebugRegistry;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Debug API server over one registry.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server exposing `registry`.
    pub fn new(config: ApiConfig, registry: Arc<DebugRegistry>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, registry)),
        }
    }

    /// Creates the router with all routes and layers configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            path = %self.state.config.debug_path,
            "MEMO debug server listening on {}", addr
        );

        axum::serve(listener, self.router()).await
    }
}

/// Serves the global registry using configuration from the environment.
pub async fn start_server() -> std::io::Result<()> {
    let config = ApiConfig::from_env();
    let addr = config.bind;
    ApiServer::new(config, DebugRegistry::global()).run(addr).await
}
