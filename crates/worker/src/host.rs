//! HTTP interception host.
//!
//! Every request that reaches the listener is turned into a
//! [`CacheRequest`] and handed to the worker; whatever the worker produces
//! goes back to the page with an `x-offcache` header naming where it came
//! from (`hit`, `miss`, `stale`, `offline`, `bypass`).
//!
//! Absolute-form targets are only accepted for the configured origin and
//! the image CDN hosts; anything else is refused with `403`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use offcache_client::{canonicalize, fetch::strip_hop_by_hop};
use offcache_core::{CacheRequest, ConfigError, Destination};
use tracing::instrument;
use url::Url;

use crate::strategy::{Served, Source};
use crate::worker::OfflineWorker;

/// Diagnostic response header carrying the serving source.
pub const SOURCE_HEADER: &str = "x-offcache";

/// Shared state for the interception handler.
#[derive(Clone)]
pub struct HostState {
    pub worker: Arc<OfflineWorker>,
    pub origin: Url,
    pub image_hosts: Vec<String>,
    pub max_bytes: usize,
}

impl HostState {
    pub fn new(worker: Arc<OfflineWorker>) -> Result<Self, ConfigError> {
        let origin = worker.config().origin_url()?;
        let image_hosts = worker.config().image_hosts.clone();
        let max_bytes = worker.config().max_bytes;
        Ok(Self { worker, origin, image_hosts, max_bytes })
    }

    /// Whether the worker may fetch `url` on a page's behalf.
    pub fn allows(&self, url: &Url) -> bool {
        if url.origin() == self.origin.origin() {
            return true;
        }
        url.host_str()
            .is_some_and(|host| self.image_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
    }
}

/// Router that sends every path and method through the worker.
pub fn router(state: HostState) -> Router {
    Router::new().fallback(intercept).with_state(state)
}

#[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
async fn intercept(State(host): State<HostState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let url = match canonicalize(&parts.uri.to_string(), &host.origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting request target");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if !host.allows(&url) {
        tracing::warn!(url = %url, "refusing target outside origin and image hosts");
        return (StatusCode::FORBIDDEN, "target not allowed").into_response();
    }

    let body = match axum::body::to_bytes(body, host.max_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let destination = destination_of(&parts.headers);
    let request = CacheRequest::new(parts.method, url, destination)
        .with_headers(parts.headers)
        .with_body(body);

    let served = host.worker.handle_fetch(request).await;
    tracing::debug!(source = %served.source, status = served.response.status.as_u16(), "served");
    into_response(served)
}

/// Resource destination of an incoming request.
///
/// `Sec-Fetch-Dest` wins when present. Otherwise `Accept` is sniffed:
/// HTML means a document, `image/*` an image, anything else no destination.
pub fn destination_of(headers: &HeaderMap) -> Destination {
    if let Some(dest) = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
        return Destination::from_token(dest);
    }

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.contains("text/html") {
        Destination::Document
    } else if accept.starts_with("image/") {
        Destination::Image
    } else {
        Destination::Empty
    }
}

fn source_label(source: Source) -> &'static str {
    match source {
        Source::Cache => "hit",
        Source::Network => "miss",
        Source::Stale => "stale",
        Source::Offline => "offline",
        Source::Bypass => "bypass",
    }
}

fn into_response(served: Served) -> Response {
    let Served { response, source } = served;

    let mut headers = response.headers;
    strip_hop_by_hop(&mut headers);
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source_label(source)));

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = response.status;
    *out.headers_mut() = headers;
    out
}
