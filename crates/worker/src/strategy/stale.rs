use std::sync::Arc;

use offcache_client::Fetcher;
use offcache_core::{CacheRequest, Destination, Partition};

use super::{NETWORK_ERROR, Served, Source, fetch_and_store, lookup, store};

/// Serve the cached copy immediately and refresh it in the background.
///
/// On a miss the fetch is awaited instead. Whenever the document comes
/// back 2xx, the paths in `warmups` are fetched into the same partition.
pub async fn stale_while_revalidate(
    fetcher: Arc<dyn Fetcher>, partition: Partition, request: CacheRequest, warmups: Vec<String>,
) -> Served {
    if let Some(entry) = lookup(&partition, &request).await {
        tracing::debug!(partition = partition.name(), url = %request.url, "cache hit, revalidating");
        tokio::spawn(revalidate(fetcher, partition, request, warmups));
        return Served::new(entry.response, Source::Cache);
    }

    match fetch_and_store(fetcher.as_ref(), &partition, &request).await {
        Ok(response) => {
            if response.is_success() && !warmups.is_empty() {
                tokio::spawn(async move {
                    warm(fetcher.as_ref(), &partition, &request, &warmups).await;
                });
            }
            Served::new(response, Source::Network)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, code = e.code(), error = %e, "network failed, no cache available");
            Served::offline(NETWORK_ERROR)
        }
    }
}

async fn revalidate(fetcher: Arc<dyn Fetcher>, partition: Partition, request: CacheRequest, warmups: Vec<String>) {
    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %request.url, code = e.code(), "background revalidation failed");
            return;
        }
    };

    if store(&partition, &request, &response).await {
        warm(fetcher.as_ref(), &partition, &request, &warmups).await;
    }
}

/// Fetch each of `paths` relative to `origin` and store what succeeds.
///
/// Failures are logged and skipped. Returns how many paths were stored.
pub async fn warm(fetcher: &dyn Fetcher, partition: &Partition, origin: &CacheRequest, paths: &[String]) -> usize {
    let mut stored = 0;
    for path in paths {
        let request = match origin.sibling(path, Destination::Document) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(path, error = %e, "skipping warm-up path");
                continue;
            }
        };

        match fetcher.fetch(&request).await {
            Ok(response) => {
                if store(partition, &request, &response).await {
                    stored += 1;
                }
            }
            Err(e) => tracing::debug!(url = %request.url, code = e.code(), "warm-up fetch failed"),
        }
    }

    if stored > 0 {
        tracing::debug!(partition = partition.name(), from = %origin.url, stored, "warmed");
    }
    stored
}
