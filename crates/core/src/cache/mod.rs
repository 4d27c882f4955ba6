//! SQLite-backed partition store for intercepted responses.
//!
//! This module provides a persistent cache of named partitions using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Idempotent partition open and whole-partition deletion
//! - Exact-key entry lookup with atomic upsert (last write wins)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use key::RequestKey;
pub use partitions::Partition;
