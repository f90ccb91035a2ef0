//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the prediction backend
    pub api_base_url: String,
    /// Directory holding the persisted cache; None keeps the cache in memory
    pub cache_dir: Option<PathBuf>,
    /// Default TTL in seconds for cached responses
    pub cache_ttl: u64,
    /// Maximum number of upstream operations running at once
    pub queue_capacity: usize,
    /// Per-request HTTP timeout in seconds
    pub request_timeout: u64,
    /// Deadline in seconds for one queued operation (0 disables it)
    pub task_timeout: u64,
    /// History window in days when a caller does not pick one
    pub history_days: u32,
    /// Warm per-entity entries after a list fetch
    pub prefetch_enabled: bool,
    /// Join concurrent fetches of the same key
    pub single_flight: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Backend base URL (default: http://localhost:8000/api)
    /// - `CACHE_DIR` - Cache directory, empty for in-memory (default: .predictdash)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 86400)
    /// - `QUEUE_CAPACITY` - Concurrent upstream operations (default: 3)
    /// - `REQUEST_TIMEOUT` - HTTP timeout in seconds (default: 30)
    /// - `TASK_TIMEOUT` - Queued operation deadline in seconds, 0 for none (default: 60)
    /// - `HISTORY_DAYS` - Default history window (default: 30)
    /// - `PREFETCH_ENABLED` - Background prefetch (default: true)
    /// - `SINGLE_FLIGHT` - Join concurrent fetches of one key (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 3600)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cache_dir = match lookup("CACHE_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir.trim())),
            None => defaults.cache_dir,
        };

        Self {
            api_base_url: lookup("API_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            cache_dir,
            cache_ttl: parse_or(lookup("CACHE_TTL"), defaults.cache_ttl),
            queue_capacity: parse_or(lookup("QUEUE_CAPACITY"), defaults.queue_capacity),
            request_timeout: parse_or(lookup("REQUEST_TIMEOUT"), defaults.request_timeout),
            task_timeout: parse_or(lookup("TASK_TIMEOUT"), defaults.task_timeout),
            history_days: parse_or(lookup("HISTORY_DAYS"), defaults.history_days),
            prefetch_enabled: parse_flag(lookup("PREFETCH_ENABLED"), defaults.prefetch_enabled),
            single_flight: parse_flag(lookup("SINGLE_FLIGHT"), defaults.single_flight),
            server_port: parse_or(lookup("SERVER_PORT"), defaults.server_port),
            cleanup_interval: parse_or(lookup("CLEANUP_INTERVAL"), defaults.cleanup_interval),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// None when task deadlines are disabled.
    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout > 0).then(|| Duration::from_secs(self.task_timeout))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            cache_dir: Some(PathBuf::from(".predictdash")),
            cache_ttl: 86_400,
            queue_capacity: 3,
            request_timeout: 30,
            task_timeout: 60,
            history_days: 30,
            prefetch_enabled: true,
            single_flight: true,
            server_port: 3000,
            cleanup_interval: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(60)));
        assert!(config.prefetch_enabled);
    }

    #[test]
    fn test_config_empty_source_is_default() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("API_BASE_URL", "http://backend:9000/api"),
            ("CACHE_DIR", ""),
            ("QUEUE_CAPACITY", "8"),
            ("TASK_TIMEOUT", "0"),
            ("PREFETCH_ENABLED", "false"),
            ("SINGLE_FLIGHT", "off"),
        ]));

        assert_eq!(config.api_base_url, "http://backend:9000/api");
        assert_eq!(config.cache_dir, None);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.task_timeout(), None);
        assert!(!config.prefetch_enabled);
        assert!(!config.single_flight);
    }

    #[test]
    fn test_config_unparseable_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_TTL", "a day"),
            ("SERVER_PORT", "99999"),
            ("PREFETCH_ENABLED", "maybe"),
        ]));

        assert_eq!(config.cache_ttl, 86_400);
        assert_eq!(config.server_port, 3000);
        assert!(config.prefetch_enabled);
    }
}
