//! Intercepted request model.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use crate::Error;
use crate::cache::RequestKey;

/// Resource type the request is fetching, as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    /// No destination (`fetch()`/XHR calls).
    Empty,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` style token. Unknown tokens map to `Other`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "" | "empty" => Destination::Empty,
            _ => Destination::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Empty => "empty",
            Destination::Other => "other",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request intercepted on behalf of a controlled page.
///
/// Only method, URL and destination drive caching decisions; headers and
/// body are carried so the network fetch can be replayed faithfully.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheRequest {
    pub fn new(method: Method, mut url: Url, destination: Destination) -> Self {
        url.set_fragment(None);
        Self { method, url, destination, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Build a GET request from a URL string.
    pub fn get(url: &str, destination: Destination) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(Method::GET, url, destination))
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Storage key: method plus normalized URL.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// A sibling GET request for another path on the same origin.
    pub fn sibling(&self, path: &str, destination: Destination) -> Result<Self, Error> {
        let url = self
            .url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        Ok(Self::new(Method::GET, url, destination))
    }
}

impl fmt::Display for CacheRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
