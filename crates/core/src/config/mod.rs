//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GO2WEB_*)
//! 2. TOML config file (if GO2WEB_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Browser-like user agent; several sites serve stripped pages to unknown agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Default `Accept` list, JSON first so APIs answer in JSON.
pub const DEFAULT_ACCEPT: &str = "application/json, text/html;q=0.9, application/xhtml+xml;q=0.8, application/xml;q=0.7";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GO2WEB_*)
/// 2. TOML config file (if GO2WEB_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache file.
    ///
    /// Set via GO2WEB_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via GO2WEB_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header sent with every fetch.
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Accept-Language header sent with every request.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// TCP connect + TLS handshake timeout in milliseconds.
    ///
    /// Set via GO2WEB_CONNECT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-read socket timeout in milliseconds.
    ///
    /// Set via GO2WEB_READ_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Maximum redirect hops per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Malformed chunk-size lines tolerated per chunked body.
    #[serde(default = "default_max_malformed_chunk_lines")]
    pub max_malformed_chunk_lines: usize,

    /// Lifetime of entries whose response carried no caching headers.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Accept any TLS certificate. Only for debugging broken hosts.
    ///
    /// Set via GO2WEB_INSECURE_TLS environment variable or `--insecure`.
    #[serde(default)]
    pub insecure_tls: bool,

    /// HTML search endpoint receiving the form POST.
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Number of search results presented (1-10).
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./go2web-cache.sqlite")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.into()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_malformed_chunk_lines() -> usize {
    16
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".into()
}

fn default_max_search_results() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            connect_timeout_ms: default_timeout_ms(),
            read_timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_malformed_chunk_lines: default_max_malformed_chunk_lines(),
            default_ttl_secs: default_ttl_secs(),
            insecure_tls: false,
            search_endpoint: default_search_endpoint(),
            max_search_results: default_max_search_results(),
        }
    }
}

impl AppConfig {
    /// Connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Default cache lifetime as Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GO2WEB_`
    /// 2. TOML file from `GO2WEB_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GO2WEB_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GO2WEB_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
