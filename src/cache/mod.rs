//! Cache Module
//!
//! Persistent TTL cache whose reads report staleness instead of evicting.

mod clock;
mod entry;
mod keys;
mod stats;
mod storage;
mod store;


use std::time::Duration;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CachedValue, Freshness};
pub use keys::{normalize_symbol, CacheKey, MAX_SYMBOL_LENGTH};
pub use stats::CacheStats;
pub use storage::{FileStorage, MemoryStorage, Storage, STORAGE_FILE_NAME};
pub use store::CacheStore;

// == Public Constants ==
/// Prefix of every key the cache store persists
pub const CACHE_NAMESPACE: &str = "price_prediction_cache_";

/// TTL applied when a write does not specify one
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
