//! Dashboard data service
//!
//! The four top-level fetches of the dashboard, each one orchestrator call.
//! Compositions fan out their sub-requests and degrade individual failures to
//! neutral values instead of failing the whole composite.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::cache::{normalize_symbol, CacheKey, CacheStore};
use crate::error::{DashboardError, Result};
use crate::fetch::{compute_metrics, FetchOptions, Fetched, Orchestrator, PriceBackend};
use crate::models::{PredictionMethod, PredictionPoint, PricePoint, StockRecord, StockSnapshot};
use crate::queue::ConcurrencyQueue;

/// Default history window in days
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

// == Dashboard Service ==
/// Cheap-to-clone entry point for dashboard data.
#[derive(Clone)]
pub struct DashboardService {
    backend: Arc<dyn PriceBackend>,
    orchestrator: Orchestrator,
    history_days: u32,
}

impl DashboardService {
    pub fn new(backend: Arc<dyn PriceBackend>, orchestrator: Orchestrator) -> Self {
        Self {
            backend,
            orchestrator,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    /// Sets the window used when a caller does not pick one.
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days.max(1);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn cache(&self) -> &CacheStore {
        self.orchestrator.cache()
    }

    pub fn queue(&self) -> &ConcurrencyQueue {
        self.orchestrator.queue()
    }

    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    // == Stock List ==
    /// Fetches every listed entity with its current price and predictions.
    ///
    /// The list request is queued once; each entity's composition is then
    /// queued on its own so N entities share the queue's capacity.
    pub async fn fetch_stock_list(&self, options: FetchOptions) -> Result<Fetched<Vec<StockSnapshot>>> {
        let backend = Arc::clone(&self.backend);
        let queue = self.queue().clone();

        self.orchestrator
            .fetch(&CacheKey::stock_list(), options, move || async move {
                let list = {
                    let backend = Arc::clone(&backend);
                    queue.add(move || async move { backend.list_stocks().await })
                }
                .await?;

                let compositions = list.into_vec().into_iter().map(|stock| {
                    let fallback = stock.clone();
                    let backend = Arc::clone(&backend);
                    let handle = queue.add(move || compose_snapshot(backend, stock));

                    async move {
                        handle.await.unwrap_or_else(|e| {
                            warn!("Snapshot of {} degraded: {}", fallback.symbol, e);
                            snapshot(fallback, 0.0, 0.0, 0.0)
                        })
                    }
                });

                Ok(join_all(compositions).await)
            })
            .await
    }

    // == Stock Detail ==
    /// Fetches one entity's record, current price and both predictions.
    pub async fn fetch_stock_detail(
        &self,
        symbol: &str,
        options: FetchOptions,
    ) -> Result<Fetched<StockSnapshot>> {
        let symbol = normalize_symbol(symbol)?;
        let backend = Arc::clone(&self.backend);

        self.orchestrator
            .fetch_queued(&CacheKey::stock_detail(&symbol), options, move || async move {
                let stock = backend
                    .stock(&symbol)
                    .await?
                    .find(|s| s.symbol.eq_ignore_ascii_case(&symbol))
                    .ok_or_else(|| DashboardError::NotFound(symbol.clone()))?;

                compose_snapshot(backend, stock).await
            })
            .await
    }

    // == Historical Series ==
    /// Fetches the price series for the last `days` days (the configured
    /// window when None).
    pub async fn fetch_historical(
        &self,
        symbol: &str,
        days: Option<u32>,
        options: FetchOptions,
    ) -> Result<Fetched<Vec<PricePoint>>> {
        let symbol = normalize_symbol(symbol)?;
        let days = days.unwrap_or(self.history_days).max(1);
        let backend = Arc::clone(&self.backend);

        self.orchestrator
            .fetch_queued(&CacheKey::historical(&symbol, days), options, move || async move {
                Ok(backend.prices(&symbol, days).await?.into_vec())
            })
            .await
    }

    // == Prediction Series ==
    pub async fn fetch_predictions(
        &self,
        symbol: &str,
        method: PredictionMethod,
        options: FetchOptions,
    ) -> Result<Fetched<Vec<PredictionPoint>>> {
        let symbol = normalize_symbol(symbol)?;
        let backend = Arc::clone(&self.backend);

        self.orchestrator
            .fetch_queued(&CacheKey::predictions(&symbol, method), options, move || async move {
                Ok(backend.predictions(&symbol, method).await?.into_vec())
            })
            .await
    }
}

impl fmt::Debug for DashboardService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardService")
            .field("orchestrator", &self.orchestrator)
            .field("history_days", &self.history_days)
            .finish_non_exhaustive()
    }
}

// == Composition ==
/// Fans out current price and both predictions for one entity.
///
/// Records whose symbol is not a valid path segment are rejected before any
/// upstream call.
async fn compose_snapshot(backend: Arc<dyn PriceBackend>, stock: StockRecord) -> Result<StockSnapshot> {
    let symbol = normalize_symbol(&stock.symbol)?;

    let (price, lstm, arima) = tokio::join!(
        backend.prices(&symbol, 1),
        backend.predictions(&symbol, PredictionMethod::Lstm),
        backend.predictions(&symbol, PredictionMethod::Arima),
    );

    let current = or_zero(&symbol, "current price", price.map(|p| p.last().map(|p| p.price)));
    let lstm = or_zero(&symbol, "lstm", lstm.map(|p| p.first().map(|p| p.predicted_price)));
    let arima = or_zero(&symbol, "arima", arima.map(|p| p.first().map(|p| p.predicted_price)));

    debug!("Composed snapshot of {}", symbol);
    Ok(snapshot(stock, current, lstm, arima))
}

fn or_zero(symbol: &str, what: &str, result: Result<Option<f64>>) -> f64 {
    match result {
        Ok(value) => value.unwrap_or(0.0),
        Err(e) => {
            warn!("{} of {} unavailable, using 0: {}", what, symbol, e);
            0.0
        }
    }
}

fn snapshot(stock: StockRecord, current: f64, lstm: f64, arima: f64) -> StockSnapshot {
    StockSnapshot {
        stock,
        current_price: current,
        lstm_prediction: lstm,
        arima_prediction: arima,
        metrics: compute_metrics(current, lstm, arima),
        updated_at: chrono::Utc::now().to_rfc3339(),
    }
}
