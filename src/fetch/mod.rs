//! Fetch Module
//!
//! Upstream client, cache-aside orchestration and the dashboard's top-level
//! fetches built on them.

mod backend;
mod metrics;
mod orchestrator;
mod payload;
mod service;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{HttpBackend, PriceBackend};
pub use metrics::{compute_metrics, percentage, round2};
pub use orchestrator::{FetchOptions, FetchSource, FetchState, FetchStats, Fetched, Orchestrator};
pub use payload::OneOrMany;
pub use service::{DashboardService, DEFAULT_HISTORY_DAYS};
