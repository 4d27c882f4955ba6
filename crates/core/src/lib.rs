//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Partition store with SQLite backend
//! - Request/response model and freshness evaluation
//! - Route table and configuration structures
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod freshness;
pub mod request;
pub mod response;
pub mod route;

pub use cache::{CacheDb, CacheEntry, Partition, RequestKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{CacheRequest, Destination};
pub use response::Response;
pub use route::{PartitionRole, RouteTable, RoutePolicy, RoutingClass, Strategy};
