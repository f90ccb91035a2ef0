//! Cache Entry Module
//!
//! Defines the persisted envelope for individual cache entries with TTL support.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single persisted cache entry with value and expiry metadata.
///
/// Serialized as `{"value": .., "timestamp": .., "expiry": ..}` with both
/// timestamps in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Write timestamp (Unix milliseconds)
    #[serde(rename = "timestamp")]
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    #[serde(rename = "expiry")]
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now_ms` that expires after `ttl`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now_ms` - Current time in Unix milliseconds
    /// * `ttl` - Time to live; callers guarantee it is non-zero
    pub fn new(value: T, now_ms: u64, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: now_ms,
            expires_at: now_ms.saturating_add(ttl.as_millis() as u64),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is still fresh at exactly `expires_at` and
    /// expired from the following millisecond on.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }
}

// == Cached Value ==
/// Result of a cache read: the value plus its freshness.
///
/// Expired values are still handed out so callers can serve them when the
/// upstream is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<T> {
    pub value: T,
    pub is_expired: bool,
    /// Unix milliseconds at which the value was written
    pub stored_at: u64,
}

// == Freshness ==
/// Outcome of a header-only probe of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Fresh,
    Stale,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), 1_000, Duration::from_secs(60));

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.stored_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1u32, 0, Duration::from_millis(1_000));

        assert!(!entry.is_expired_at(1_000), "fresh at exactly expires_at");
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_wire_format_field_names() {
        let entry = CacheEntry::new(42, 5, Duration::from_millis(10));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["value"], 42);
        assert_eq!(json["timestamp"], 5);
        assert_eq!(json["expiry"], 15);
    }
}
