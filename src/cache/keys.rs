//! Cache Key Module
//!
//! Builds the keys under which each upstream resource is cached.

use std::fmt;

use crate::error::{DashboardError, Result};
use crate::models::PredictionMethod;

/// Maximum accepted ticker symbol length.
pub const MAX_SYMBOL_LENGTH: usize = 16;

// == Cache Key ==
/// Identifies one resource together with its parameters.
///
/// Symbols are normalised by [`normalize_symbol`], which excludes the `:`
/// separator, so two distinct resources never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the full entity list.
    pub fn stock_list() -> Self {
        Self("stocks".to_string())
    }

    pub fn stock_detail(symbol: &str) -> Self {
        Self(format!("detail:{}", symbol))
    }

    pub fn historical(symbol: &str, days: u32) -> Self {
        Self(format!("history:{}:{}", symbol, days))
    }

    pub fn predictions(symbol: &str, method: PredictionMethod) -> Self {
        Self(format!("predictions:{}:{}", symbol, method.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Symbol Normalisation ==
/// Trims and upper-cases a ticker symbol, rejecting anything outside
/// `[A-Z0-9.^=-]`.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_ascii_uppercase();

    if symbol.is_empty() {
        return Err(DashboardError::InvalidRequest(
            "Symbol cannot be empty".to_string(),
        ));
    }
    if symbol.len() > MAX_SYMBOL_LENGTH {
        return Err(DashboardError::InvalidRequest(format!(
            "Symbol exceeds maximum length of {} characters",
            MAX_SYMBOL_LENGTH
        )));
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')))
    {
        return Err(DashboardError::InvalidRequest(format!(
            "Symbol contains invalid character '{}'",
            bad
        )));
    }

    Ok(symbol)
}
