//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::InvalidInput(err.to_string())
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a timeout is below 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `max_redirects` exceeds 20
    /// - `max_malformed_chunk_lines` is 0
    /// - `max_search_results` is outside 1-10
    /// - `search_endpoint` is not an absolute http(s) URL
    ///
    /// Returns `ConfigError::Missing` if `cache_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("connect_timeout_ms", self.connect_timeout_ms), ("read_timeout_ms", self.read_timeout_ms)]
        {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.max_malformed_chunk_lines == 0 {
            return Err(ConfigError::Invalid {
                field: "max_malformed_chunk_lines".into(),
                reason: "must be at least 1".into(),
            });
        }

        if !(1..=10).contains(&self.max_search_results) {
            return Err(ConfigError::Invalid {
                field: "max_search_results".into(),
                reason: "must be between 1 and 10".into(),
            });
        }

        match url::Url::parse(&self.search_endpoint) {
            Ok(endpoint) if matches!(endpoint.scheme(), "http" | "https") => {}
            Ok(endpoint) => {
                return Err(ConfigError::Invalid {
                    field: "search_endpoint".into(),
                    reason: format!("unsupported scheme: {}", endpoint.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "search_endpoint".into(), reason: e.to_string() });
            }
        }

        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_path".into(),
                hint: "Set GO2WEB_CACHE_PATH environment variable".into(),
            });
        }

        if self.insecure_tls {
            tracing::warn!("TLS certificate validation is disabled (insecure_tls)");
        }

        Ok(())
    }
}
