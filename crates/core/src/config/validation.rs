//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from the config file or defaults.

use std::net::SocketAddr;

use crate::config::AppConfig;
use crate::route::Strategy;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` is empty or contains whitespace or `-`
    /// - `origin` is not an http(s) URL, or `listen_addr` is not a socket address
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - a timeout is 0 or exceeds 5 minutes
    /// - a static asset or API prefix does not start with `/`
    /// - a route lacks the parameter its strategy needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.is_empty() || self.generation.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(invalid("generation", "must be a non-empty tag without whitespace or '-'"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("listen_addr", format!("not a socket address: {}", self.listen_addr)));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        check_timeout("fetch_timeout_ms", self.fetch_timeout_ms)?;
        if let Some(ms) = self.install_timeout_ms {
            check_timeout("install_timeout_ms", ms)?;
        }

        if let Some(asset) = self.static_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(invalid("static_assets", format!("path must start with '/': {asset}")));
        }
        if let Some(prefix) = self.api_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("api_prefixes", format!("prefix must start with '/': {prefix}")));
        }
        if self.image_hosts.iter().any(|h| h.is_empty() || h.contains('/')) {
            return Err(invalid("image_hosts", "entries must be bare host names"));
        }

        for (class, policy) in self.routes.iter() {
            let field = format!("routes.{class}");
            match policy.strategy {
                Strategy::CacheFirstWithTtl => {
                    if policy.max_age_ms.is_none_or(|ms| ms == 0) {
                        return Err(invalid(field, "cache-first-with-ttl requires max_age_ms > 0"));
                    }
                }
                Strategy::NetworkFirstWithTimeout => match policy.timeout_ms {
                    Some(ms) => check_timeout(&field, ms)?,
                    None => return Err(invalid(field, "network-first-with-timeout requires timeout_ms")),
                },
                Strategy::CacheFirst | Strategy::StaleWhileRevalidate => {}
            }
        }

        for (path, targets) in &self.warmups {
            if !path.starts_with('/') || targets.iter().any(|t| !t.starts_with('/')) {
                return Err(invalid("warmups", format!("paths must start with '/': {path}")));
            }
        }

        if self.static_assets.iter().any(|a| a == "/") {
            tracing::debug!("static manifest contains '/'; every path ending in '/' routes as static");
        }

        Ok(())
    }
}

fn check_timeout(field: &str, ms: u64) -> Result<(), ConfigError> {
    if ms == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    if ms > 300_000 {
        return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
    }
    Ok(())
}
