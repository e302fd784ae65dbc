//! Sync configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use quotesync_common::{Error, Result};

/// Default polling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 15;

/// Default upper bound for a remote fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Configuration for the sync engine and scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between periodic sync cycles.
    pub interval_secs: u64,
    /// Upper bound for a single remote fetch, `None` to wait indefinitely.
    pub fetch_timeout_secs: Option<u64>,
    /// Remote feed endpoint. Without one the client runs offline.
    pub endpoint: Option<String>,
    /// How remote objects map onto quotes.
    pub field_mapping: FieldMapping,
}

impl SyncConfig {
    /// Polling interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Fetch timeout as a duration.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// Parse the configured endpoint.
    ///
    /// # Errors
    /// - Returns `Error::InvalidInput` if the endpoint is not an http(s) URL
    pub fn endpoint_url(&self) -> Result<Option<Url>> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Ok(None);
        };

        let url = Url::parse(endpoint)
            .map_err(|e| Error::InvalidInput(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            other => Err(Error::InvalidInput(format!(
                "Unsupported endpoint scheme: {}",
                other
            ))),
        }
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::InvalidInput(
                "Sync interval must be at least one second".to_string(),
            ));
        }
        if self.fetch_timeout_secs == Some(0) {
            return Err(Error::InvalidInput(
                "Fetch timeout must be at least one second".to_string(),
            ));
        }
        self.endpoint_url()?;
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            fetch_timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
            endpoint: None,
            field_mapping: FieldMapping::default(),
        }
    }
}

/// Mapping from remote JSON objects to quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Field holding the quote text.
    pub text_field: String,
    /// Field holding the category.
    pub category_field: String,
    /// Category used when the remote object has none.
    pub default_category: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            text_field: "text".to_string(),
            category_field: "category".to_string(),
            default_category: "remote".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(15));
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(10)));
        assert!(config.endpoint_url().unwrap().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"interval_secs": 60, "field_mapping": {"text_field": "title"}}"#)
                .unwrap();
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.fetch_timeout_secs, Some(10));
        assert_eq!(config.field_mapping.text_field, "title");
        assert_eq!(config.field_mapping.category_field, "category");
    }

    #[test]
    fn test_endpoint_validation() {
        let mut config = SyncConfig {
            endpoint: Some("https://example.com/quotes".to_string()),
            ..Default::default()
        };
        assert!(config.endpoint_url().unwrap().is_some());

        config.endpoint = Some("ftp://example.com".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));

        config.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SyncConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
