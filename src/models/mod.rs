//! Request, response and domain models
//!
//! Domain records decoded from the upstream, plus the DTOs serialized by
//! the dashboard gateway.

pub mod domain;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use domain::{
    PredictionMethod, PredictionMetrics, PricePoint, PredictionPoint, StockRecord, StockSnapshot,
};
pub use requests::{HistoryQuery, RefreshQuery};
pub use responses::{
    ApiResponse, ClearResponse, ErrorBody, ErrorResponse, HealthResponse, StatsResponse,
};
