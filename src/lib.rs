//! Predictdash - data layer for a price prediction dashboard
//!
//! Persistent TTL cache with stale fallback, a bounded FIFO queue for
//! upstream calls, cache-aside orchestration and background prefetch, served
//! through a small JSON gateway.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod queue;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{DashboardError, Result};
pub use tasks::{spawn_cleanup_task, PrefetchScheduler};
