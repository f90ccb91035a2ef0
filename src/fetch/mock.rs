//! In-memory [`PriceBackend`] for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DashboardError, Result};
use crate::fetch::{OneOrMany, PriceBackend};
use crate::models::{PredictionMethod, PredictionPoint, PricePoint, StockRecord};

#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    stocks: Vec<StockRecord>,
    prices: HashMap<String, f64>,
    predictions: HashMap<(String, PredictionMethod), f64>,
    failing: AtomicBool,
    latency: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, symbol: &str, price: f64, lstm: f64, arima: f64) -> Self {
        self.stocks.push(StockRecord::new(symbol, format!("{} Inc.", symbol)));
        self.prices.insert(symbol.to_string(), price);
        self.predictions
            .insert((symbol.to_string(), PredictionMethod::Lstm), lstm);
        self.predictions
            .insert((symbol.to_string(), PredictionMethod::Arima), arima);
        self
    }

    /// Delays every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every subsequent call fail with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of recorded calls whose label starts with `prefix`.
    pub fn calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| c.starts_with(prefix)).count())
            .unwrap_or(0)
    }

    async fn record(&self, label: String) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(label.clone());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DashboardError::Network(format!("{} unavailable", label)));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceBackend for MockBackend {
    async fn list_stocks(&self) -> Result<OneOrMany<StockRecord>> {
        self.record("list".to_string()).await?;
        Ok(OneOrMany::from(self.stocks.clone()))
    }

    async fn stock(&self, symbol: &str) -> Result<OneOrMany<StockRecord>> {
        self.record(format!("stock:{}", symbol)).await?;
        Ok(self
            .stocks
            .iter()
            .find(|s| s.symbol == symbol)
            .cloned()
            .map(OneOrMany::Single)
            .unwrap_or_default())
    }

    async fn prices(&self, symbol: &str, days: u32) -> Result<OneOrMany<PricePoint>> {
        self.record(format!("prices:{}:{}", symbol, days)).await?;
        let Some(price) = self.prices.get(symbol) else {
            return Ok(OneOrMany::Empty);
        };

        let series = (0..days.max(1))
            .map(|day| PricePoint {
                date: format!("2024-01-{:02}", day + 1),
                price: price - f64::from(days.max(1) - 1 - day),
            })
            .collect::<Vec<_>>();
        Ok(OneOrMany::from(series))
    }

    async fn predictions(
        &self,
        symbol: &str,
        method: PredictionMethod,
    ) -> Result<OneOrMany<PredictionPoint>> {
        self.record(format!("predictions:{}:{}", symbol, method)).await?;
        Ok(self
            .predictions
            .get(&(symbol.to_string(), method))
            .map(|price| {
                OneOrMany::Single(PredictionPoint {
                    date: "2024-02-01".to_string(),
                    predicted_price: *price,
                })
            })
            .unwrap_or_default())
    }
}
