//! API Handlers
//!
//! HTTP request handlers for each dashboard gateway endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheStore, FileStorage, MemoryStorage, Storage, SystemClock};
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::fetch::{DashboardService, HttpBackend, Orchestrator};
use crate::models::{
    ApiResponse, ClearResponse, HealthResponse, HistoryQuery, PredictionMethod, PredictionPoint,
    PricePoint, RefreshQuery, StatsResponse, StockSnapshot,
};
use crate::queue::ConcurrencyQueue;
use crate::tasks::PrefetchScheduler;

/// Application state shared across all handlers.
///
/// Every field is a cheap handle over shared state, so cloning per request
/// is fine.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: DashboardService,
    pub prefetch: PrefetchScheduler,
}

impl AppState {
    /// Creates a new AppState whose prefetch scheduler shares `service`.
    pub fn new(service: DashboardService) -> Self {
        Self {
            prefetch: PrefetchScheduler::new(service.clone()),
            service,
        }
    }

    /// Wires storage, queue, orchestrator and upstream client from the Config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage: Arc<dyn Storage> = match &config.cache_dir {
            Some(dir) => {
                let storage = FileStorage::open(dir)?;
                info!("Persisting cache to {}", storage.path().display());
                Arc::new(storage)
            }
            None => {
                info!("Keeping cache in memory");
                Arc::new(MemoryStorage::new())
            }
        };

        let cache = CacheStore::new(storage, Arc::new(SystemClock), config.cache_ttl());
        let queue = ConcurrencyQueue::with_task_timeout(config.queue_capacity, config.task_timeout());
        let orchestrator = Orchestrator::new(cache, queue).with_single_flight(config.single_flight);
        let backend = HttpBackend::new(config.api_base_url.clone(), config.request_timeout())?;

        let service = DashboardService::new(Arc::new(backend), orchestrator)
            .with_history_days(config.history_days);
        let prefetch = PrefetchScheduler::new(service.clone()).with_enabled(config.prefetch_enabled);

        Ok(Self { service, prefetch })
    }

    pub fn cache(&self) -> &CacheStore {
        self.service.cache()
    }
}

/// Handler for GET /api/stocks
///
/// Returns every entity with prices, predictions and metrics, then warms the
/// per-entity entries in the background.
pub async fn list_stocks_handler(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<Vec<StockSnapshot>>>> {
    let fetched = state.service.fetch_stock_list(query.options()).await?;
    state.prefetch.schedule(&fetched.value);

    Ok(Json(fetched.into()))
}

/// Handler for GET /api/stocks/:symbol
pub async fn stock_detail_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<StockSnapshot>>> {
    let fetched = state
        .service
        .fetch_stock_detail(&symbol, query.options())
        .await?;

    Ok(Json(fetched.into()))
}

/// Handler for GET /api/stocks/:symbol/history
pub async fn history_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<PricePoint>>>> {
    if let Some(error_msg) = query.validate() {
        return Err(DashboardError::InvalidRequest(error_msg));
    }

    let fetched = state
        .service
        .fetch_historical(&symbol, query.days, query.options())
        .await?;

    Ok(Json(fetched.into()))
}

/// Handler for GET /api/stocks/:symbol/predictions/:method
pub async fn predictions_handler(
    State(state): State<AppState>,
    Path((symbol, method)): Path<(String, String)>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<Vec<PredictionPoint>>>> {
    let method: PredictionMethod = method.parse()?;

    let fetched = state
        .service
        .fetch_predictions(&symbol, method, query.options())
        .await?;

    Ok(Json(fetched.into()))
}

/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache();
    let stats = cache.stats();

    Json(StatsResponse {
        hit_rate: stats.hit_rate(),
        cache: stats,
        entries: cache.len(),
        fetch: state.service.orchestrator().stats(),
        queue: state.service.queue().stats(),
        prefetch_in_flight: state.prefetch.in_flight(),
    })
}

/// Handler for DELETE /api/cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache().clear_all();
    info!("Cache cleared: removed {} entries", removed);

    Json(ClearResponse { removed })
}

/// Handler for POST /api/cache/clear-expired
pub async fn clear_expired_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        removed: state.cache().clear_expired(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
