//! Deployment configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading:
//!
//! 1. Environment variables (`OFFCACHE_*`, `__` separates nested keys)
//! 2. TOML config file (`OFFCACHE_CONFIG_FILE`, else `offcache.toml` in the
//!    working directory, if present)
//! 3. Built-in defaults
//!
//! Everything here is fixed for the lifetime of a worker generation; there
//! is no runtime reconfiguration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::route::{PartitionRole, RouteTable};

mod validation;

pub use validation::ConfigError;

/// File name looked up in the working directory by [`AppConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "offcache.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "OFFCACHE_";

/// Worker configuration.
///
/// Loading precedence (highest wins):
/// 1. Environment variables, e.g. `OFFCACHE_GENERATION=v4` or
///    `OFFCACHE_ROUTES__API__TIMEOUT_MS=1500`
/// 2. TOML file
/// 3. Built-in defaults via `Default::default()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache generation tag embedded in every partition name.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Origin that relative request paths are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the interception host listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite partition store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to buffer per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Hard ceiling for any single outbound fetch, in milliseconds.
    ///
    /// Route timeouts are enforced separately by the strategy engine.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Optional bound on the whole install-time pre-population.
    ///
    /// Unset means install waits as long as the fetches take.
    #[serde(default)]
    pub install_timeout_ms: Option<u64>,

    /// Paths pre-cached at install and routed cache-first.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path prefixes routed as API calls.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Hosts whose every request is routed as an image.
    #[serde(default = "default_image_hosts")]
    pub image_hosts: Vec<String>,

    /// Routing class → strategy table.
    #[serde(default)]
    pub routes: RouteTable,

    /// Document path → paths to prefetch after it is fetched from the network.
    #[serde(default = "default_warmups")]
    pub warmups: BTreeMap<String, Vec<String>>,
}

fn default_generation() -> String {
    "v3".into()
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/calculator",
        "/about",
        "/blog",
        "/static/js/bundle.js",
        "/static/css/main.css",
        "/favicon.ico",
        "/favicon.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api".into()]
}

fn default_image_hosts() -> Vec<String> {
    vec!["images.unsplash.com".into()]
}

fn default_warmups() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([("/calculator".to_string(), vec!["/about".to_string()])])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            install_timeout_ms: None,
            static_assets: default_static_assets(),
            api_prefixes: default_api_prefixes(),
            image_hosts: default_image_hosts(),
            routes: RouteTable::default(),
            warmups: default_warmups(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be parsed
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("OFFCACHE_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    /// Load configuration from a specific TOML file, environment on top.
    ///
    /// A missing file is not an error; the defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["config_file"])
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );
        Self::from_figment(figment)
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Partition name for a role in the current generation.
    pub fn partition_name(&self, role: PartitionRole) -> String {
        role.partition_name(&self.generation)
    }

    /// Names of every partition belonging to the current generation.
    pub fn current_partitions(&self) -> Vec<String> {
        PartitionRole::ALL.iter().map(|role| self.partition_name(*role)).collect()
    }

    /// Generation predicate used during activation.
    pub fn is_current_partition(&self, name: &str) -> bool {
        PartitionRole::ALL
            .iter()
            .any(|role| role.partition_name(&self.generation) == name)
    }

    /// Parsed origin URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Per-fetch ceiling as Duration for use with reqwest.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_ms.map(Duration::from_millis)
    }

    /// Warm-up paths for a document path, empty when none are configured.
    pub fn warmups_for(&self, path: &str) -> &[String] {
        self.warmups.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Strategy;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation, "v3");
        assert_eq!(config.db_path, PathBuf::from("./offcache.sqlite"));
        assert_eq!(config.user_agent, "offcache/0.1");
        assert_eq!(config.static_assets.len(), 8);
        assert_eq!(config.api_prefixes, vec!["/api".to_string()]);
        assert_eq!(config.image_hosts, vec!["images.unsplash.com".to_string()]);
        assert!(config.install_timeout_ms.is_none());
    }

    #[test]
    fn test_current_partitions() {
        let config = AppConfig::default();
        assert_eq!(
            config.current_partitions(),
            vec!["static-v3".to_string(), "dynamic-v3".to_string(), "images-v3".to_string()]
        );
        assert!(config.is_current_partition("images-v3"));
        assert!(!config.is_current_partition("static-v2"));
        assert!(!config.is_current_partition("saturn-return-v2"));
    }

    #[test]
    fn test_warmups_for() {
        let config = AppConfig::default();
        assert_eq!(config.warmups_for("/calculator"), ["/about".to_string()]);
        assert!(config.warmups_for("/blog").is_empty());
    }

    #[test]
    fn test_from_figment_toml_overrides() {
        let toml = r#"
            generation = "v4"
            api_prefixes = ["/api", "/graphql"]

            [routes.api]
            strategy = "network-first-with-timeout"
            partition = "dynamic"
            timeout_ms = 1500

            [warmups]
            "/" = ["/calculator"]
        "#;
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.generation, "v4");
        assert_eq!(config.api_prefixes.len(), 2);
        assert_eq!(config.routes.api.timeout_ms, Some(1500));
        assert_eq!(config.routes.image.strategy, Strategy::CacheFirstWithTtl);
        assert_eq!(config.warmups_for("/"), ["/calculator".to_string()]);
        assert_eq!(config.partition_name(PartitionRole::Static), "static-v4");
    }

    #[test]
    fn test_from_figment_rejects_invalid() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("generation = \"\""));
        let result = AppConfig::from_figment(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "generation"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/offcache.toml").unwrap();
        assert_eq!(config.generation, "v3");
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().port(), Some(8080));
    }
}
