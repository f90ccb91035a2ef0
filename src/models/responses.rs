//! Response DTOs for the dashboard gateway
//!
//! Defines the envelopes handed to the presentation layer.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::error::DashboardError;
use crate::fetch::{FetchSource, FetchStats, Fetched};
use crate::queue::QueueStats;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn millis_to_rfc3339(ms: u64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms as i64).map(|t| t.to_rfc3339())
}

/// Success envelope: `{success, data, timestamp}` plus where the data came from.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    /// Time the response was produced (RFC 3339)
    pub timestamp: String,
    pub source: FetchSource,
    /// Time the data was written to the cache (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wraps a value that did not come through the cache.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: now_rfc3339(),
            source: FetchSource::Network,
            cached_at: None,
        }
    }
}

impl<T> From<Fetched<T>> for ApiResponse<T> {
    fn from(fetched: Fetched<T>) -> Self {
        Self {
            success: true,
            timestamp: now_rfc3339(),
            source: fetched.source,
            cached_at: millis_to_rfc3339(fetched.stored_at),
            data: fetched.value,
        }
    }
}

/// Standardized error object: `{code, message, details}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

/// Error envelope for all failure conditions.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: String,
}

impl From<&DashboardError> for ErrorResponse {
    fn from(error: &DashboardError) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: error.code().to_string(),
                message: error.to_string(),
                details: error.details(),
            },
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Fresh-read ratio of the cache store
    pub hit_rate: f64,
    /// Number of entries currently stored
    pub entries: usize,
    pub fetch: FetchStats,
    pub queue: QueueStats,
    /// Prefetch jobs still tracked by the scheduler
    pub prefetch_in_flight: usize,
}

/// Response body for the cache clearing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_from_fetched() {
        let fetched = Fetched {
            value: vec![1, 2, 3],
            source: FetchSource::StaleCache,
            stored_at: 0,
        };
        let resp = ApiResponse::from(fetched);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["source"], "stale_cache");
        assert_eq!(json["cached_at"], "1970-01-01T00:00:00+00:00");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_envelope_ok_omits_cached_at() {
        let json = serde_json::to_value(ApiResponse::ok("x")).unwrap();
        assert!(json.get("cached_at").is_none());
        assert_eq!(json["source"], "network");
    }

    #[test]
    fn test_error_response_shape() {
        let resp = ErrorResponse::from(&DashboardError::NotFound("TSLA".to_string()));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Not found: TSLA");
        assert_eq!(json["error"]["details"], "TSLA");
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
