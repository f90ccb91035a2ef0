//! API Routes
//!
//! Configures the Axum router with all dashboard gateway endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, clear_cache_handler, clear_expired_handler, health_handler,
    history_handler, list_stocks_handler, predictions_handler, stock_detail_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/stocks` - Every entity with metrics
/// - `GET /api/stocks/:symbol` - One entity with metrics
/// - `GET /api/stocks/:symbol/history` - Price series
/// - `GET /api/stocks/:symbol/predictions/:method` - Prediction series
/// - `GET /api/cache/stats` - Cache, fetch and queue statistics
/// - `DELETE /api/cache` - Drop every cached entry
/// - `POST /api/cache/clear-expired` - Drop expired entries
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/stocks", get(list_stocks_handler))
        .route("/api/stocks/:symbol", get(stock_detail_handler))
        .route("/api/stocks/:symbol/history", get(history_handler))
        .route(
            "/api/stocks/:symbol/predictions/:method",
            get(predictions_handler),
        )
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .route("/api/cache/clear-expired", post(clear_expired_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::fetch::mock::MockBackend;
    use crate::fetch::{DashboardService, Orchestrator};
    use crate::queue::ConcurrencyQueue;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let backend = Arc::new(MockBackend::new().with_stock("AAPL", 10.0, 11.0, 9.0));
        let orchestrator = Orchestrator::new(
            CacheStore::in_memory(Duration::from_secs(300)),
            ConcurrencyQueue::new(3),
        );
        create_router(AppState::new(DashboardService::new(backend, orchestrator)))
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("GET", "/api/cache/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stock_routes() {
        assert_eq!(status_of("GET", "/api/stocks").await, StatusCode::OK);
        assert_eq!(status_of("GET", "/api/stocks/AAPL").await, StatusCode::OK);
        assert_eq!(
            status_of("GET", "/api/stocks/AAPL/history?days=5").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of("GET", "/api/stocks/AAPL/predictions/arima").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_cache_routes() {
        assert_eq!(status_of("DELETE", "/api/cache").await, StatusCode::OK);
        assert_eq!(
            status_of("POST", "/api/cache/clear-expired").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_unknown_stock_not_found() {
        assert_eq!(
            status_of("GET", "/api/stocks/TSLA").await,
            StatusCode::NOT_FOUND
        );
    }
}
