//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELFCHECK_*)
//! 2. TOML config file (if SHELFCHECK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELFCHECK_*)
/// 2. TOML config file (if SHELFCHECK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog base URL, e.g. `https://opac.example.org/webOPACClient`.
    ///
    /// Set via SHELFCHECK_BASE_URL environment variable.
    /// Required only when the engine is built.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Login identifier sent with the session handshake (`start.do?Login=`).
    ///
    /// Set via SHELFCHECK_LOGIN_ID environment variable.
    #[serde(default = "default_login_id")]
    pub login_id: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELFCHECK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes accepted per catalog response.
    ///
    /// Set via SHELFCHECK_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Per-request HTTP timeout in milliseconds.
    ///
    /// Set via SHELFCHECK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for a whole lookup, including queue wait and the session retry.
    ///
    /// Set via SHELFCHECK_QUERY_TIMEOUT_MS environment variable.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Maximum number of catalog requests in flight.
    ///
    /// Set via SHELFCHECK_MAX_CONCURRENT environment variable.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Minimum spacing between two outbound catalog requests in milliseconds.
    ///
    /// Set via SHELFCHECK_REQUEST_SPACING_MS environment variable.
    #[serde(default = "default_request_spacing_ms")]
    pub request_spacing_ms: u64,

    /// Lifetime of a catalog session before it is renewed.
    ///
    /// Set via SHELFCHECK_SESSION_TTL_SECS environment variable.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Retention window of cached lookup results.
    ///
    /// Set via SHELFCHECK_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Interval of the background cache sweep.
    ///
    /// Set via SHELFCHECK_CACHE_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,

    /// Repeat a year-qualified search with the bare title when it finds nothing.
    ///
    /// Set via SHELFCHECK_TITLE_ONLY_FALLBACK environment variable.
    #[serde(default = "default_true")]
    pub title_only_fallback: bool,
}

fn default_login_id() -> String {
    "opacdirect".into()
}

fn default_user_agent() -> String {
    "shelfcheck/0.1".into()
}

fn default_max_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_query_timeout_ms() -> u64 {
    90_000
}

fn default_max_concurrent() -> usize {
    5
}

fn default_request_spacing_ms() -> u64 {
    200
}

fn default_session_ttl_secs() -> u64 {
    300
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_sweep_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            login_id: default_login_id(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            max_concurrent: default_max_concurrent(),
            request_spacing_ms: default_request_spacing_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
            title_only_fallback: true,
        }
    }
}

impl AppConfig {
    /// Per-request timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whole-lookup deadline.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn request_spacing(&self) -> Duration {
        Duration::from_millis(self.request_spacing_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELFCHECK_`
    /// 2. TOML file from `SHELFCHECK_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SHELFCHECK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELFCHECK_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the catalog base URL is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the base URL is not set.
    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "base_url".into(),
                hint: "Set SHELFCHECK_BASE_URL environment variable".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.login_id, "opacdirect");
        assert_eq!(config.user_agent, "shelfcheck/0.1");
        assert_eq!(config.max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.query_timeout_ms, 90_000);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.request_spacing_ms, 200);
        assert_eq!(config.session_ttl_secs, 300);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert!(config.title_only_fallback);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.query_timeout(), Duration::from_secs(90));
        assert_eq!(config.request_spacing(), Duration::from_millis(200));
        assert_eq!(config.session_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache_sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_require_base_url_missing() {
        let config = AppConfig::default();
        let result = config.require_base_url();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));

        let config = AppConfig { base_url: Some("   ".into()), ..Default::default() };
        assert!(matches!(config.require_base_url(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_base_url_present() {
        let config = AppConfig { base_url: Some("https://opac.example.org/webOPACClient".into()), ..Default::default() };
        assert_eq!(config.require_base_url().unwrap(), "https://opac.example.org/webOPACClient");
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELFCHECK_BASE_URL", "https://opac.example.org/webOPACClient");
            jail.set_env("SHELFCHECK_MAX_CONCURRENT", "8");
            jail.set_env("SHELFCHECK_REQUEST_SPACING_MS", "100");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.base_url.as_deref(), Some("https://opac.example.org/webOPACClient"));
            assert_eq!(config.max_concurrent, 8);
            assert_eq!(config.request_spacing_ms, 100);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file_env_wins() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shelfcheck.toml",
                r#"
                base_url = "https://file.example.org/webOPACClient"
                max_concurrent = 6
                "#,
            )?;
            jail.set_env("SHELFCHECK_CONFIG_FILE", "shelfcheck.toml");
            jail.set_env("SHELFCHECK_MAX_CONCURRENT", "7");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.base_url.as_deref(), Some("https://file.example.org/webOPACClient"));
            assert_eq!(config.max_concurrent, 7);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELFCHECK_MAX_CONCURRENT", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
