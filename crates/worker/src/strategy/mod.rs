//! Caching strategies.
//!
//! Each strategy takes a request and the partition its route is bound to
//! and always produces a response. Network failures are absorbed here:
//! the caller sees either a real response, a cached one, or a synthetic
//! `503` with a short plain-text body.
//!
//! A response is written to the partition only after a fetch completed
//! with a 2xx status. Store failures are logged and otherwise ignored, so
//! a broken store degrades to network-only behaviour.

mod cache_first;
mod network_first;
mod stale;

pub use cache_first::{cache_first, cache_first_with_ttl};
pub use network_first::network_first;
pub use stale::{stale_while_revalidate, warm};

use std::fmt;

use offcache_client::Fetcher;
use offcache_core::{CacheEntry, CacheRequest, Error, Partition, Response};

/// Body of the synthetic 503 when a fetch failed and nothing was cached.
pub const NETWORK_ERROR: &str = "Network error";

/// Body of the synthetic 503 when network-first gave up.
pub const NETWORK_TIMEOUT: &str = "Network timeout";

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Cache hit, network not consulted (or consulted in the background).
    Cache,
    /// Fresh from the network.
    Network,
    /// From the cache after the network failed.
    Stale,
    /// Synthetic 503.
    Offline,
    /// Not intercepted; straight to the network.
    Bypass,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
            Source::Stale => "stale",
            Source::Offline => "offline",
            Source::Bypass => "bypass",
        }
    }

    /// Whether producing this response involved a failed network attempt.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Source::Stale | Source::Offline)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with its provenance.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    pub fn new(response: Response, source: Source) -> Self {
        Self { response, source }
    }

    pub fn offline(message: &'static str) -> Self {
        Self::new(Response::unavailable(message), Source::Offline)
    }
}

/// Read an entry, treating store errors as a miss.
pub(crate) async fn lookup(partition: &Partition, request: &CacheRequest) -> Option<CacheEntry> {
    match partition.get(&request.key()).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(
                partition = partition.name(),
                url = %request.url,
                code = e.code(),
                error = %e,
                "cache read failed; treating as miss"
            );
            None
        }
    }
}

/// Store a successful response. Returns whether anything was written.
pub(crate) async fn store(partition: &Partition, request: &CacheRequest, response: &Response) -> bool {
    if !response.is_success() {
        return false;
    }
    match partition.put(&request.key(), response).await {
        Ok(()) => {
            tracing::debug!(partition = partition.name(), url = %request.url, "stored");
            true
        }
        Err(e) => {
            tracing::warn!(
                partition = partition.name(),
                url = %request.url,
                code = e.code(),
                error = %e,
                "cache write failed; serving unstored response"
            );
            false
        }
    }
}

/// Fetch, then store the result if it succeeded.
pub(crate) async fn fetch_and_store(
    fetcher: &dyn Fetcher, partition: &Partition, request: &CacheRequest,
) -> Result<Response, Error> {
    let response = fetcher.fetch(request).await?;
    store(partition, request, &response).await;
    Ok(response)
}
