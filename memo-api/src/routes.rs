//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the router with the health and debug routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let path = state.config.debug_path.clone();

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            &path,
            get(handlers::view_caches).post(handlers::flush_caches),
        )
        .route(&format!("{}/log", path), post(handlers::log_snapshot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use memo_cache::{Cache, Completion};
    use memo_core::MemoError;
    use memo_debug::{DebugRegistry, Snapshot};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::ApiConfig;

    fn registry_with_users() -> (Arc<DebugRegistry>, Arc<Cache<String>>) {
        let registry = Arc::new(DebugRegistry::new());
        let cache = registry.register(Arc::new(Cache::new()), Some("users"));
        let load = cache.wrap_named("load_user", |args: Vec<Value>, done: Completion<String, MemoError>| {
            done(Ok(Some(format!("user-{}", args[0]))))
        });
        load.invoke(vec![json!(1)], Box::new(|_| {}));
        load.invoke(vec![json!(1)], Box::new(|_| {}));
        (registry, cache)
    }

    fn test_app(registry: Arc<DebugRegistry>) -> Router {
        create_router(Arc::new(AppState::new(ApiConfig::default(), registry)))
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (registry, _) = registry_with_users();
        let (status, body) = send(test_app(registry), "GET", "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["caches"], 1);
    }

    #[tokio::test]
    async fn test_get_snapshot() {
        let (registry, _) = registry_with_users();
        let (status, body) = send(test_app(registry), "GET", "/debug/caches").await;

        assert_eq!(status, StatusCode::OK);
        let snapshot: Snapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.pid, std::process::id());
        let users = snapshot.cache("users").unwrap();
        assert_eq!(users.hitrate, 50);
        assert_eq!(users.keycount, 1);
        assert!(users.values.is_none());
    }

    #[tokio::test]
    async fn test_get_detail() {
        let (registry, _) = registry_with_users();
        let (status, body) = send(test_app(registry), "GET", "/debug/caches?detail=users").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["values"], json!(["user-1"]));
    }

    #[tokio::test]
    async fn test_get_never_flushes() {
        let (registry, cache) = registry_with_users();
        let (status, body) = send(test_app(registry), "GET", "/debug/caches?flush=users").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["keycount"], 1);
        assert_eq!(cache.stats().resets(), 0);
    }

    #[tokio::test]
    async fn test_post_flush() {
        let (registry, cache) = registry_with_users();
        let (status, body) = send(test_app(registry), "POST", "/debug/caches?flush=users").await;

        assert_eq!(status, StatusCode::OK);
        // Row reports what the flush discarded
        assert_eq!(body["data"][0]["keycount"], 1);
        assert_eq!(body["data"][0]["resets"], 1);
        assert_eq!(cache.store().keycount(), 0);
    }

    #[tokio::test]
    async fn test_custom_debug_path() {
        let (registry, _) = registry_with_users();
        let config = ApiConfig::default().with_debug_path("/ops/memo");
        let app = create_router(Arc::new(AppState::new(config, registry)));

        let (status, _) = send(app.clone(), "GET", "/ops/memo").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, "GET", "/debug/caches").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_query_is_bad_request() {
        let (registry, _) = registry_with_users();
        let (status, body) = send(test_app(registry), "GET", "/debug/caches?detail=a&detail=b").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_log_route() {
        let (registry, _) = registry_with_users();
        let (status, _) = send(test_app(registry), "POST", "/debug/caches/log").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
