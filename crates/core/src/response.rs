//! Response model shared by the network client, the store and the host.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

use crate::Error;

/// A complete, buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Synthetic `503` with a short plain-text diagnostic body.
    pub fn unavailable(message: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self { status: StatusCode::SERVICE_UNAVAILABLE, headers, body: Bytes::from_static(message.as_bytes()) }
    }

    /// HTTP-level success (2xx). Only such responses are ever stored.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Origin timestamp taken from the response's own `Date` header.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.headers
            .get(header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
    }

    /// Headers as (name, raw value) pairs, in order, repeats included.
    ///
    /// Values are kept as bytes so obs-text (e.g. a UTF-8 filename in
    /// `content-disposition`) survives storage.
    pub fn header_pairs(&self) -> Vec<(String, Vec<u8>)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    /// Rebuild a response from its stored columns.
    pub fn from_parts(status: u16, pairs: Vec<(String, Vec<u8>)>, body: Vec<u8>) -> Result<Self, Error> {
        let status = StatusCode::from_u16(status).map_err(|e| Error::CorruptEntry(format!("status: {e}")))?;
        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(format!("{name}: {e}")))?;
            let value = HeaderValue::from_bytes(&value).map_err(|e| Error::CorruptEntry(format!("{name}: {e}")))?;
            headers.append(name, value);
        }
        Ok(Self { status, headers, body: Bytes::from(body) })
    }
}

/// Parse an HTTP date in IMF-fixdate, RFC 850, or asctime form.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %d %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&collapsed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as an IMF-fixdate `Date` header value.
pub fn format_http_date(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
