//! Offline cache worker.
//!
//! This crate ties the partition store and the network client together:
//! - Request classification into routing classes
//! - The four caching strategies
//! - Install/activate lifecycle and the background-sync hook
//! - An axum host that feeds intercepted requests to the worker

pub mod classify;
pub mod host;
pub mod lifecycle;
pub mod precache;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::Classifier;
pub use lifecycle::WorkerState;
pub use strategy::{Served, Source};
pub use sync::{BACKGROUND_SYNC_TAG, NoopSync, SyncHandler};
pub use worker::OfflineWorker;
