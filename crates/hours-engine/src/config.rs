//! Configuration for the network-backed holiday lookup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HoursError, Result};

/// Public Japanese holiday API; one JSON object of ISO date → name per year.
pub const DEFAULT_HOLIDAY_ENDPOINT: &str = "https://holidays-jp.github.io/api/v1/{year}/date.json";

/// Request timeout for a single year's fetch.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and how holidays are fetched.
///
/// Deserializable so a host application can embed it in its own config
/// file; every field falls back to its default when missing.
///
/// ```
/// use hours_engine::HolidayConfig;
///
/// let config: HolidayConfig = serde_json::from_str(r#"{"timeout_secs": 3}"#).unwrap();
/// assert_eq!(config.timeout_secs, 3);
/// assert!(config.endpoint.contains("{year}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidayConfig {
    /// URL template; `{year}` is replaced with the four-digit year.
    pub endpoint: String,
    /// Upper bound on a single request, in seconds.
    pub timeout_secs: u64,
    /// Directory for per-year JSON cache files. `None` keeps the cache in
    /// memory only.
    pub cache_dir: Option<PathBuf>,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_HOLIDAY_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl HolidayConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the endpoint template and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HoursError::InvalidConfig`] if the endpoint lacks a `{year}`
    /// placeholder or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.contains("{year}") {
            return Err(HoursError::InvalidConfig(format!(
                "endpoint '{}' has no {{year}} placeholder",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(HoursError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The endpoint URL for one year.
    pub fn url_for(&self, year: i32) -> String {
        self.endpoint.replace("{year}", &year.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = HolidayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_url_for_year() {
        let config = HolidayConfig::default();
        assert_eq!(
            config.url_for(2026),
            "https://holidays-jp.github.io/api/v1/2026/date.json"
        );
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let config = HolidayConfig::default().with_endpoint("https://example.com/holidays.json");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Invalid configuration"), "got: {err}");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = HolidayConfig::default().with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HolidayConfig =
            serde_json::from_str(r#"{"cache_dir": "/tmp/holidays"}"#).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/holidays")));
        assert_eq!(config.endpoint, DEFAULT_HOLIDAY_ENDPOINT);
    }
}
