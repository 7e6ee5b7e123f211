//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound for the throttle width.
const MAX_CONCURRENT_LIMIT: usize = 32;

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

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `query_timeout_ms` is shorter than `timeout_ms`
    /// - `max_concurrent` is 0 or exceeds 32
    /// - `request_spacing_ms` exceeds 5 seconds
    /// - any TTL or the sweep interval is 0
    /// - `user_agent` or `login_id` is empty
    /// - `base_url` is set but does not canonicalize to an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }
        if self.query_timeout_ms < self.timeout_ms {
            return Err(invalid("query_timeout_ms", "must be at least timeout_ms"));
        }

        if self.max_concurrent == 0 {
            return Err(invalid("max_concurrent", "must be greater than 0"));
        }
        if self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(invalid("max_concurrent", "must not exceed 32"));
        }
        if self.request_spacing_ms > 5_000 {
            return Err(invalid("request_spacing_ms", "must not exceed 5000ms"));
        }

        if self.session_ttl_secs == 0 {
            return Err(invalid("session_ttl_secs", "must be greater than 0"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }
        if self.cache_sweep_interval_secs == 0 {
            return Err(invalid("cache_sweep_interval_secs", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.login_id.trim().is_empty() {
            return Err(invalid("login_id", "must not be empty"));
        }

        if let Some(base_url) = &self.base_url {
            crate::base_url::canonicalize(base_url)
                .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;
        }

        if self.request_spacing_ms == 0 {
            tracing::warn!("request_spacing_ms is 0; catalog requests will not be paced");
        }

        Ok(())
    }
}
