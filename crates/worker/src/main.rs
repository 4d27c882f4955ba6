//! offcache-worker entry point.
//!
//! Loads `offcache.toml`, installs and activates the current cache
//! generation, then serves intercepted requests over HTTP.
//! Logs are JSON on stderr; filter with `RUST_LOG`.

use std::sync::Arc;

use anyhow::{Context, Result};
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::{AppConfig, CacheDb};
use offcache_worker::host::{self, HostState};
use offcache_worker::lifecycle::has_previous_generation;
use offcache_worker::{OfflineWorker, WorkerState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(generation = %config.generation, origin = %config.origin, "starting offcache worker");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache store at {}", config.db_path.display()))?;
    let replacing = has_previous_generation(&db, &config).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let listen_addr = config.listen_addr.clone();

    let worker = Arc::new(OfflineWorker::new(config, db, Arc::new(fetcher)));

    let mut states = worker.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            if state != WorkerState::Installed {
                continue;
            }
            if replacing {
                tracing::info!("new content available; activating");
            } else {
                tracing::info!("content cached for offline use");
            }
        }
    });

    if let Err(e) = worker.install().await {
        tracing::error!(code = e.code(), error = %e, "install failed; previous generation stays in place");
        return Err(e.into());
    }
    let evicted = worker.activate().await?;
    tracing::info!(evicted = evicted.len(), "worker activated");

    let app = host::router(HostState::new(worker)?);
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "intercepting requests");

    axum::serve(listener, app).await?;

    Ok(())
}
