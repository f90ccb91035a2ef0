//! Upstream backend client
//!
//! Read-only access to the prediction backend's JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::fetch::OneOrMany;
use crate::models::{PredictionMethod, PredictionPoint, PricePoint, StockRecord};

// == Backend Trait ==
/// The upstream routes this layer consumes.
///
/// Every call fails with [`DashboardError::Network`] when the request is
/// rejected or answered with a non-2xx status, and with
/// [`DashboardError::Parse`] when the body has the wrong shape.
#[async_trait]
pub trait PriceBackend: Send + Sync {
    /// `GET /stocks`
    async fn list_stocks(&self) -> Result<OneOrMany<StockRecord>>;

    /// `GET /stocks/{symbol}`
    async fn stock(&self, symbol: &str) -> Result<OneOrMany<StockRecord>>;

    /// `GET /stocks/{symbol}/prices?days={days}`
    async fn prices(&self, symbol: &str, days: u32) -> Result<OneOrMany<PricePoint>>;

    /// `GET /stocks/{symbol}/predictions/{method}`
    async fn predictions(
        &self,
        symbol: &str,
        method: PredictionMethod,
    ) -> Result<OneOrMany<PredictionPoint>>;
}

// == HTTP Backend ==
/// [`PriceBackend`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Builds a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DashboardError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<OneOrMany<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DashboardError::Network(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Network(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DashboardError::Network(format!("GET {} body: {}", url, e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| DashboardError::Parse(format!("GET {}: {}", url, e)))
    }
}

#[async_trait]
impl PriceBackend for HttpBackend {
    async fn list_stocks(&self) -> Result<OneOrMany<StockRecord>> {
        self.get_json("/stocks").await
    }

    async fn stock(&self, symbol: &str) -> Result<OneOrMany<StockRecord>> {
        self.get_json(&format!("/stocks/{}", symbol)).await
    }

    async fn prices(&self, symbol: &str, days: u32) -> Result<OneOrMany<PricePoint>> {
        self.get_json(&format!("/stocks/{}/prices?days={}", symbol, days))
            .await
    }

    async fn predictions(
        &self,
        symbol: &str,
        method: PredictionMethod,
    ) -> Result<OneOrMany<PredictionPoint>> {
        self.get_json(&format!("/stocks/{}/predictions/{}", symbol, method))
            .await
    }
}
