//! Domain models for upstream prediction data
//!
//! Only the fields needed to key, store, and derive metrics are typed;
//! anything else an upstream record carries is preserved verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Forecasting method a prediction series was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMethod {
    Lstm,
    Arima,
}

impl PredictionMethod {
    /// Every method, in display order.
    pub const ALL: [PredictionMethod; 2] = [PredictionMethod::Lstm, PredictionMethod::Arima];

    /// Path segment and cache-key component.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMethod::Lstm => "lstm",
            PredictionMethod::Arima => "arima",
        }
    }
}

impl fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionMethod {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lstm" => Ok(PredictionMethod::Lstm),
            "arima" => Ok(PredictionMethod::Arima),
            other => Err(DashboardError::InvalidRequest(format!(
                "Unknown prediction method '{}'",
                other
            ))),
        }
    }
}

/// An entity as listed by the upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Upstream fields this layer does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StockRecord {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            sector: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// One observed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    #[serde(alias = "close")]
    pub price: f64,
}

/// One predicted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: String,
    #[serde(alias = "prediction", alias = "price")]
    pub predicted_price: f64,
}

/// Deltas between both predictions and the current price.
///
/// Every figure is rounded to 2 decimals; percentages are 0 when the
/// current price is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    pub lstm_difference: f64,
    pub lstm_percentage: f64,
    pub arima_difference: f64,
    pub arima_percentage: f64,
    pub average_difference: f64,
    pub average_percentage: f64,
}

/// An entity with its current price, both predictions and derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub stock: StockRecord,
    pub current_price: f64,
    pub lstm_prediction: f64,
    pub arima_prediction: f64,
    pub metrics: PredictionMetrics,
    /// RFC 3339 time the snapshot was composed
    pub updated_at: String,
}
