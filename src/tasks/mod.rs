//! Background Tasks Module
//!
//! Contains background work that runs alongside request handling.
//!
//! # Tasks
//! - Cache cleanup: removes expired cache entries at configured intervals
//! - Prefetch: warms per-entity cache entries after a list fetch

mod cleanup;
mod prefetch;

pub use cleanup::spawn_cleanup_task;
pub use prefetch::PrefetchScheduler;
