//! API Routes
//!
//! Configures the Axum router with all inspection endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, has_handler, health_handler, info_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a JSON value
/// - `GET /get/:key` - Retrieve a value by key
/// - `GET /has/:key` - Check for a fresh entry without reading it
/// - `DELETE /del/:key` - Delete a key
/// - `DELETE /clear` - Drop all entries and reset stats
/// - `GET /stats` - Cache statistics
/// - `GET /info` - Per-entry details
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, the stats panel is served separately
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/has/:key", get(has_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/clear", delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/info", get(info_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::from_config(&CacheConfig {
            cleanup_interval_ms: 0,
            ..CacheConfig::default()
        }))
    }

    async fn status_of(method: &str, uri: &str, body: Body) -> StatusCode {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("GET", "/health", Body::empty()).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_and_info_endpoints() {
        assert_eq!(status_of("GET", "/stats", Body::empty()).await, StatusCode::OK);
        assert_eq!(status_of("GET", "/info", Body::empty()).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let body = Body::from(r#"{"key":"test","value":{"tag":"BR-7"}}"#);
        assert_eq!(status_of("PUT", "/set", body).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        assert_eq!(
            status_of("GET", "/get/nonexistent", Body::empty()).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_clear_endpoint() {
        assert_eq!(status_of("DELETE", "/clear", Body::empty()).await, StatusCode::OK);
    }
}
