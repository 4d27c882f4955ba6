//! The offline worker: lifecycle state plus fetch dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use offcache_client::Fetcher;
use offcache_core::{AppConfig, CacheDb, CacheRequest, Error, RoutingClass, Strategy};
use tokio::sync::watch;

use crate::classify::Classifier;
use crate::lifecycle::{self, WorkerState};
use crate::strategy::{self, NETWORK_ERROR, Served, Source};
use crate::sync::{BACKGROUND_SYNC_TAG, NoopSync, SyncHandler};

/// One generation of the offline cache worker.
///
/// Created in `Parsed`. [`install`](Self::install) pre-caches the manifest,
/// [`activate`](Self::activate) evicts older generations and starts
/// interception. Until then [`handle_fetch`](Self::handle_fetch) passes
/// every request straight to the network.
pub struct OfflineWorker {
    config: Arc<AppConfig>,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    classifier: Classifier,
    sync_handler: Arc<dyn SyncHandler>,
    state: watch::Sender<WorkerState>,
    offline: AtomicBool,
}

impl OfflineWorker {
    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let classifier = Classifier::from_config(&config);
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            config: Arc::new(config),
            db,
            fetcher,
            classifier,
            sync_handler: Arc::new(NoopSync),
            state,
            offline: AtomicBool::new(false),
        }
    }

    pub fn with_sync_handler(mut self, handler: Arc<dyn SyncHandler>) -> Self {
        self.sync_handler = handler;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions, e.g. to announce that new content is
    /// ready once a generation reaches `Installed`.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        tracing::info!(generation = %self.config.generation, from = %prev, to = %next, "worker state");
    }

    fn expect_state(&self, expected: WorkerState, action: &str) -> Result<(), Error> {
        let current = self.state();
        if current != expected {
            return Err(Error::InvalidState(format!("cannot {action} from {current}, expected {expected}")));
        }
        Ok(())
    }

    /// Run the install handler. On failure the worker becomes `Redundant`.
    pub async fn install(&self) -> Result<usize, Error> {
        self.expect_state(WorkerState::Parsed, "install")?;
        self.transition(WorkerState::Installing);

        match lifecycle::install(&self.db, &self.config, self.fetcher.as_ref()).await {
            Ok(count) => {
                // Skip waiting: ready to activate straight away.
                self.transition(WorkerState::Installed);
                Ok(count)
            }
            Err(e) => {
                tracing::error!(generation = %self.config.generation, code = e.code(), error = %e, "install failed");
                self.transition(WorkerState::Redundant);
                Err(match e {
                    Error::InstallFailed(_) => e,
                    other => Error::InstallFailed(other.to_string()),
                })
            }
        }
    }

    /// Run the activate handler and claim clients.
    ///
    /// Returns the names of evicted partitions. If eviction fails the
    /// worker stays `Installed` and activation may be retried.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.expect_state(WorkerState::Installed, "activate")?;
        self.transition(WorkerState::Activating);

        match lifecycle::activate(&self.db, &self.config).await {
            Ok(deleted) => {
                self.transition(WorkerState::Activated);
                Ok(deleted)
            }
            Err(e) => {
                tracing::error!(code = e.code(), error = %e, "activate failed");
                self.transition(WorkerState::Installed);
                Err(e)
            }
        }
    }

    /// Install then activate.
    pub async fn start(&self) -> Result<(), Error> {
        self.install().await?;
        self.activate().await?;
        Ok(())
    }

    /// Produce a response for an intercepted request. Never fails.
    pub async fn handle_fetch(&self, request: CacheRequest) -> Served {
        let class = if self.state().can_intercept_fetch() {
            self.classifier.classify(&request)
        } else {
            None
        };

        let served = match class {
            Some(class) => self.dispatch(class, request).await,
            None => self.bypass(request).await,
        };

        self.note_connectivity(served.source);
        served
    }

    async fn dispatch(&self, class: RoutingClass, request: CacheRequest) -> Served {
        let policy = self.config.routes.policy(class);
        let partition = self.db.partition(&self.config.partition_name(policy.partition));

        tracing::debug!(class = %class, partition = partition.name(), url = %request.url, "dispatch");

        match policy.strategy {
            Strategy::CacheFirst => strategy::cache_first(self.fetcher.as_ref(), &partition, &request).await,
            Strategy::CacheFirstWithTtl => {
                let max_age = policy.max_age().unwrap_or(Duration::ZERO);
                strategy::cache_first_with_ttl(self.fetcher.as_ref(), &partition, &request, max_age).await
            }
            Strategy::NetworkFirstWithTimeout => {
                let timeout = policy.timeout().unwrap_or_else(|| self.config.fetch_timeout());
                strategy::network_first(self.fetcher.as_ref(), &partition, &request, timeout).await
            }
            Strategy::StaleWhileRevalidate => {
                let warmups = self.config.warmups_for(request.url.path()).to_vec();
                strategy::stale_while_revalidate(self.fetcher.clone(), partition, request, warmups).await
            }
        }
    }

    async fn bypass(&self, request: CacheRequest) -> Served {
        match self.fetcher.fetch(&request).await {
            Ok(response) => Served::new(response, Source::Bypass),
            Err(e) => {
                tracing::warn!(method = %request.method, url = %request.url, code = e.code(), "pass-through fetch failed");
                Served::offline(NETWORK_ERROR)
            }
        }
    }

    /// Fire background sync once the network answers again after a
    /// degraded response.
    fn note_connectivity(&self, source: Source) {
        if source.is_degraded() {
            self.offline.store(true, Ordering::Relaxed);
            return;
        }

        if matches!(source, Source::Network | Source::Bypass) && self.offline.swap(false, Ordering::Relaxed) {
            tracing::info!("connectivity restored");
            let handler = self.sync_handler.clone();
            tokio::spawn(async move { handler.sync().await });
        }
    }

    /// Dispatch a sync event. Returns whether the tag was handled.
    pub async fn sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync tag");
            return false;
        }
        self.sync_handler.sync().await;
        true
    }
}
