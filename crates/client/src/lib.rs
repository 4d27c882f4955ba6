//! Network client for offcache.
//!
//! This crate provides the outbound HTTP fetch used by the strategy engine,
//! behind the [`Fetcher`] trait so strategies can run against any transport.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use fetch::url::{UrlError, canonicalize};
