use std::time::Duration;

use offcache_client::Fetcher;
use offcache_core::{CacheRequest, Error, Partition};

use super::{NETWORK_TIMEOUT, Served, Source, lookup, store};

/// Try the network for at most `timeout`, then fall back to the cache.
///
/// The deadline covers the fetch only. An answer that arrives in time is
/// stored afterwards, however long the write takes. When the deadline
/// passes the in-flight fetch is dropped, which cancels it; a late answer
/// is never stored.
pub async fn network_first(
    fetcher: &dyn Fetcher, partition: &Partition, request: &CacheRequest, timeout: Duration,
) -> Served {
    let outcome = match tokio::time::timeout(timeout, fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::FetchTimeout(format!("{}: no answer within {}ms", request.url, timeout.as_millis()))),
    };

    let err = match outcome {
        Ok(response) => {
            store(partition, request, &response).await;
            return Served::new(response, Source::Network);
        }
        Err(e) => e,
    };

    match lookup(partition, request).await {
        Some(entry) => {
            tracing::warn!(url = %request.url, code = err.code(), "network unavailable, serving cached entry");
            Served::new(entry.response, Source::Stale)
        }
        None => {
            tracing::warn!(url = %request.url, code = err.code(), error = %err, "network unavailable, no cache available");
            Served::offline(NETWORK_TIMEOUT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFetcher, dated_response, partition};
    use axum::http::StatusCode;
    use offcache_core::Destination;
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_millis(3000);

    fn request(url: &str) -> CacheRequest {
        CacheRequest::get(url, Destination::Empty).unwrap()
    }

    #[tokio::test]
    async fn test_network_success_is_stored() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/api/foo", 200, "{\"v\":2}");
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/foo");
        partition.put(&req.key(), &dated_response("{\"v\":1}", chrono::Duration::minutes(5))).await.unwrap();

        let served = network_first(&*fetcher, &partition, &req, TIMEOUT).await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(&served.response.body[..], b"{\"v\":2}");
        let stored = partition.get(&req.key()).await.unwrap().unwrap();
        assert_eq!(&stored.response.body[..], b"{\"v\":2}");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_cache() {
        let fetcher = ScriptedFetcher::new();
        fetcher.fail("/api/foo");
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/foo");
        partition.put(&req.key(), &dated_response("{\"v\":1}", chrono::Duration::minutes(5))).await.unwrap();

        let served = network_first(&*fetcher, &partition, &req, TIMEOUT).await;

        assert_eq!(served.source, Source::Stale);
        assert_eq!(&served.response.body[..], b"{\"v\":1}");
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_timeout_503() {
        let fetcher = ScriptedFetcher::new();
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/foo");

        let served = network_first(&*fetcher, &partition, &req, TIMEOUT).await;

        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&served.response.body[..], NETWORK_TIMEOUT.as_bytes());
    }

    #[tokio::test]
    async fn test_non_success_is_returned_not_cached() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/api/foo", 500, "boom");
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/foo");
        partition.put(&req.key(), &dated_response("{\"v\":1}", chrono::Duration::minutes(5))).await.unwrap();

        let served = network_first(&*fetcher, &partition, &req, TIMEOUT).await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let stored = partition.get(&req.key()).await.unwrap().unwrap();
        assert_eq!(&stored.response.body[..], b"{\"v\":1}");
    }

    #[tokio::test]
    async fn test_slow_network_times_out_to_cache() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond_after("/api/slow", 200, "late", Duration::from_secs(2));
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/slow");
        partition.put(&req.key(), &dated_response("cached", chrono::Duration::minutes(5))).await.unwrap();

        let start = Instant::now();
        let served = network_first(&*fetcher, &partition, &req, Duration::from_millis(50)).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(served.source, Source::Stale);
        assert_eq!(&served.response.body[..], b"cached");
    }

    #[tokio::test]
    async fn test_answer_near_deadline_is_stored() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond_after("/api/slow", 200, "just in time", Duration::from_millis(40));
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/slow");

        let served = network_first(&*fetcher, &partition, &req, Duration::from_millis(150)).await;

        assert_eq!(served.source, Source::Network);
        assert_eq!(&served.response.body[..], b"just in time");
        let stored = partition.get(&req.key()).await.unwrap().unwrap();
        assert_eq!(&stored.response.body[..], b"just in time");
    }

    #[tokio::test]
    async fn test_slow_network_late_answer_not_stored() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond_after("/api/slow", 200, "late", Duration::from_millis(200));
        let partition = partition("dynamic-v3").await;
        let req = request("http://origin.test/api/slow");

        let served = network_first(&*fetcher, &partition, &req, Duration::from_millis(20)).await;
        assert_eq!(served.source, Source::Offline);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(partition.get(&req.key()).await.unwrap().is_none());
    }
}
