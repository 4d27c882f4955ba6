//! All-or-nothing pre-population of a partition.

use futures_util::future::try_join_all;
use offcache_client::Fetcher;
use offcache_core::{CacheRequest, Error, Partition, Response};

/// Fetch every request concurrently and store them in one transaction.
///
/// Any transport failure or non-2xx answer fails the whole batch and
/// nothing is written. Returns the number of stored entries.
pub async fn add_all(fetcher: &dyn Fetcher, partition: &Partition, requests: &[CacheRequest]) -> Result<usize, Error> {
    let responses = try_join_all(requests.iter().map(|request| fetch_ok(fetcher, request))).await?;

    let items: Vec<_> = requests
        .iter()
        .zip(responses)
        .map(|(request, response)| (request.key(), response))
        .collect();

    partition
        .put_all(&items)
        .await
        .map_err(|e| Error::InstallFailed(format!("storing into {}: {e}", partition.name())))?;

    tracing::debug!(partition = partition.name(), count = items.len(), "pre-cached");
    Ok(items.len())
}

async fn fetch_ok(fetcher: &dyn Fetcher, request: &CacheRequest) -> Result<Response, Error> {
    let response = fetcher
        .fetch(request)
        .await
        .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;

    if !response.is_success() {
        return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status.as_u16())));
    }
    Ok(response)
}
