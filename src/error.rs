//! Error types for the dashboard data layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Dashboard Error Enum ==
/// Unified error type for the dashboard data layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// Upstream request was rejected or answered with a non-2xx status
    #[error("Network failure: {0}")]
    Network(String),

    /// Upstream body was not in the expected shape
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Entity absent from the upstream listing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cache persistence failed (never surfaced by the cache store itself)
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Caller supplied an unusable argument
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A queued operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The queue was shut down before the operation completed
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation panicked or was dropped before settling
    #[error("Operation aborted before completion")]
    TaskAborted,
}

impl DashboardError {
    /// Stable machine-readable code exposed to the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            DashboardError::Network(_) => "NETWORK_ERROR",
            DashboardError::Parse(_) => "PARSE_ERROR",
            DashboardError::NotFound(_) => "NOT_FOUND",
            DashboardError::Storage(_) => "STORAGE_ERROR",
            DashboardError::InvalidRequest(_) => "INVALID_REQUEST",
            DashboardError::Timeout(_) => "TIMEOUT",
            DashboardError::Cancelled => "CANCELLED",
            DashboardError::TaskAborted => "TASK_ABORTED",
        }
    }

    /// HTTP status used when the error reaches the gateway.
    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::Network(_) | DashboardError::Parse(_) => StatusCode::BAD_GATEWAY,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DashboardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DashboardError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Storage(_) | DashboardError::TaskAborted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Detail payload, when the variant carries one.
    pub fn details(&self) -> Option<String> {
        match self {
            DashboardError::Network(msg)
            | DashboardError::Parse(msg)
            | DashboardError::NotFound(msg)
            | DashboardError::Storage(msg)
            | DashboardError::InvalidRequest(msg) => Some(msg.clone()),
            DashboardError::Timeout(after) => Some(format!("{}ms", after.as_millis())),
            DashboardError::Cancelled | DashboardError::TaskAborted => None,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the dashboard data layer.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DashboardError::Network("x".into()).code(), "NETWORK_ERROR");
        assert_eq!(DashboardError::Parse("x".into()).code(), "PARSE_ERROR");
        assert_eq!(DashboardError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(DashboardError::Storage("x".into()).code(), "STORAGE_ERROR");
        assert_eq!(DashboardError::Cancelled.code(), "CANCELLED");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DashboardError::NotFound("AAPL".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DashboardError::Network("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DashboardError::Timeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_timeout_details_in_millis() {
        let err = DashboardError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.details().as_deref(), Some("1500ms"));
        assert!(DashboardError::TaskAborted.details().is_none());
    }
}
