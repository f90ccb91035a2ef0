//! API Module
//!
//! HTTP handlers and routing for the dashboard gateway.
//!
//! # Endpoints
//! - `GET /api/stocks` - Every entity with prices, predictions and metrics
//! - `GET /api/stocks/:symbol` - One entity
//! - `GET /api/stocks/:symbol/history` - Price series
//! - `GET /api/stocks/:symbol/predictions/:method` - Prediction series
//! - `GET /api/cache/stats` - Statistics
//! - `DELETE /api/cache`, `POST /api/cache/clear-expired` - Cache maintenance
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
