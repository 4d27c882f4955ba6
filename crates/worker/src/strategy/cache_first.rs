use std::time::Duration;

use offcache_client::Fetcher;
use offcache_core::{CacheRequest, Partition, freshness};

use super::{NETWORK_ERROR, Served, Source, fetch_and_store, lookup};

/// Serve from cache when present; go to the network only on a miss.
///
/// A hit is returned as-is with no freshness check and no network call.
pub async fn cache_first(fetcher: &dyn Fetcher, partition: &Partition, request: &CacheRequest) -> Served {
    if let Some(entry) = lookup(partition, request).await {
        tracing::debug!(partition = partition.name(), url = %request.url, "cache hit");
        return Served::new(entry.response, Source::Cache);
    }

    match fetch_and_store(fetcher, partition, request).await {
        Ok(response) => Served::new(response, Source::Network),
        Err(e) => {
            tracing::warn!(url = %request.url, code = e.code(), error = %e, "network failed, no cache available");
            Served::offline(NETWORK_ERROR)
        }
    }
}

/// Cache-first, but only while the cached copy is younger than `max_age`.
///
/// Stale or missing entries are refetched. If that fetch fails, a stale
/// entry is still better than nothing and is served.
pub async fn cache_first_with_ttl(
    fetcher: &dyn Fetcher, partition: &Partition, request: &CacheRequest, max_age: Duration,
) -> Served {
    let cached = lookup(partition, request).await;

    if let Some(entry) = &cached
        && freshness::is_fresh(entry, max_age)
    {
        tracing::debug!(partition = partition.name(), url = %request.url, "fresh cache hit");
        return Served::new(entry.response.clone(), Source::Cache);
    }

    match fetch_and_store(fetcher, partition, request).await {
        Ok(response) => Served::new(response, Source::Network),
        Err(e) => match cached {
            Some(entry) => {
                tracing::warn!(url = %request.url, code = e.code(), "network failed, serving stale entry");
                Served::new(entry.response, Source::Stale)
            }
            None => {
                tracing::warn!(url = %request.url, code = e.code(), error = %e, "network failed, no cache available");
                Served::offline(NETWORK_ERROR)
            }
        },
    }
}
