//! Install and activate handlers.
//!
//! A worker moves through `Parsed → Installing → Installed → Activating →
//! Activated`. A failed install ends in `Redundant` and the previous
//! generation keeps serving from its partitions.

use std::fmt;

use axum::http::Method;
use offcache_client::{Fetcher, canonicalize};
use offcache_core::{AppConfig, CacheDb, CacheRequest, Destination, Error, PartitionRole};

use crate::precache;

/// Lifecycle state of a worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Only an activated worker intercepts fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest paths resolved against the configured origin.
pub fn manifest_requests(config: &AppConfig) -> Result<Vec<CacheRequest>, Error> {
    let origin = config
        .origin_url()
        .map_err(|e| Error::InstallFailed(e.to_string()))?;

    config
        .static_assets
        .iter()
        .map(|path| {
            let url = canonicalize(path, &origin).map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            Ok(CacheRequest::new(Method::GET, url, Destination::Empty))
        })
        .collect()
}

/// Open the current generation's partitions and pre-cache the manifest.
///
/// Returns the number of pre-cached entries. Nothing outside the current
/// generation is touched, so a failure leaves the previous one intact.
pub async fn install(db: &CacheDb, config: &AppConfig, fetcher: &dyn Fetcher) -> Result<usize, Error> {
    for name in config.current_partitions() {
        db.open_partition(&name).await?;
    }

    let requests = manifest_requests(config)?;
    let partition = db.partition(&config.partition_name(PartitionRole::Static));

    let populate = precache::add_all(fetcher, &partition, &requests);
    let count = match config.install_timeout() {
        Some(limit) => tokio::time::timeout(limit, populate)
            .await
            .map_err(|_| Error::InstallFailed(format!("pre-cache did not finish within {}ms", limit.as_millis())))??,
        None => populate.await?,
    };

    tracing::info!(partition = partition.name(), count, "static assets pre-cached");
    Ok(count)
}

/// Whether the store holds partitions from another generation.
///
/// Checked before install: only then does a finished install replace
/// content that was already being served.
pub async fn has_previous_generation(db: &CacheDb, config: &AppConfig) -> Result<bool, Error> {
    let names = db.partition_names().await?;
    Ok(names.iter().any(|name| !config.is_current_partition(name)))
}

/// Delete every partition that does not belong to the current generation.
///
/// Returns the deleted names, sorted.
pub async fn activate(db: &CacheDb, config: &AppConfig) -> Result<Vec<String>, Error> {
    let deleted = db
        .retain_partitions(|name| config.is_current_partition(name))
        .await?;

    for name in &deleted {
        tracing::info!(partition = %name, "deleting old cache");
    }
    Ok(deleted)
}
