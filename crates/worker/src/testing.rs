//! Scripted network double for strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use offcache_client::Fetcher;
use offcache_core::response::format_http_date;
use offcache_core::{CacheDb, CacheRequest, Error, Partition, Response};

#[derive(Clone)]
enum Script {
    Respond { status: u16, body: &'static str, delay: Duration },
    Fail,
}

/// Answers by URL path. Unscripted paths fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &'static str) {
        self.respond_after(path, status, body, Duration::ZERO);
    }

    pub(crate) fn respond_after(&self, path: &str, status: u16, body: &'static str, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Script::Respond { status, body, delay });
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Script::Fail);
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());
        let script = self.routes.lock().unwrap().get(&path).cloned();

        match script {
            Some(Script::Respond { status, body, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                headers.insert(
                    header::DATE,
                    HeaderValue::from_str(&format_http_date(chrono::Utc::now())).unwrap(),
                );
                Ok(Response::new(StatusCode::from_u16(status).unwrap(), headers, body))
            }
            Some(Script::Fail) | None => Err(Error::FetchFailed(format!("{path}: connection refused"))),
        }
    }
}

/// A response dated `age` ago, as if stored from an earlier fetch.
pub(crate) fn dated_response(body: &'static str, age: chrono::Duration) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::DATE,
        HeaderValue::from_str(&format_http_date(chrono::Utc::now() - age)).unwrap(),
    );
    Response::new(StatusCode::OK, headers, body)
}

pub(crate) async fn partition(name: &str) -> Partition {
    let db = CacheDb::open_in_memory().await.unwrap();
    db.open_partition(name).await.unwrap()
}

/// Poll until `check` passes or a second has gone by.
pub(crate) async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
