//! Request DTOs for the dashboard gateway
//!
//! Query strings accepted by the gateway endpoints.

use serde::Deserialize;

use crate::fetch::FetchOptions;

/// Longest history window a caller may request
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// `?refresh=true` forces a round trip past a fresh cache entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
}

impl RefreshQuery {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            force_refresh: self.refresh,
            ttl: None,
        }
    }
}

/// Query for the history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    /// Window in days; the configured default when absent
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

impl HistoryQuery {
    /// Validates the window.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.days {
            Some(0) => Some("days must be at least 1".to_string()),
            Some(days) if days > MAX_HISTORY_DAYS => Some(format!(
                "days exceeds maximum of {}",
                MAX_HISTORY_DAYS
            )),
            _ => None,
        }
    }

    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            force_refresh: self.refresh,
            ttl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_query_defaults_to_false() {
        let query: RefreshQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.options().force_refresh);
    }

    #[test]
    fn test_history_query_validate() {
        let ok = HistoryQuery { days: Some(30), refresh: false };
        assert!(ok.validate().is_none());

        let zero = HistoryQuery { days: Some(0), refresh: false };
        assert!(zero.validate().is_some());

        let huge = HistoryQuery { days: Some(MAX_HISTORY_DAYS + 1), refresh: true };
        assert!(huge.validate().is_some());
        assert!(huge.options().force_refresh);
    }
}
