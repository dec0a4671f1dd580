//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::debug;

use memo_debug::{RequestMethod, Snapshot, ViewQuery};

use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Registered cache count
    pub caches: usize,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        caches: state.registry.len(),
    })
}

/// GET <debug_path>
///
/// Never flushes, even when `flush` is present.
pub async fn view_caches(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Json<Snapshot>> {
    let Query(query) = query?;
    let query = query.with_method(RequestMethod::Get);
    Ok(Json(state.registry.view(&query)))
}

/// POST <debug_path>
pub async fn flush_caches(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Json<Snapshot>> {
    let Query(query) = query?;
    debug!(flush = ?query.flush, "Mutating debug request");
    let query = query.with_method(RequestMethod::Post);
    Ok(Json(state.registry.view(&query)))
}

/// POST <debug_path>/log
pub async fn log_snapshot(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.registry.log()?;
    Ok(StatusCode::NO_CONTENT)
}
