//! Routing classes, caching strategies, and the table binding them.
//!
//! The route table is fixed at deployment: each routing class maps to one
//! strategy, the partition role it reads and writes, and the strategy's
//! parameters (TTL for image-style caching, timeout for network-first).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The category a request is sorted into for strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingClass {
    Static,
    Image,
    Api,
    Document,
    Other,
}

impl RoutingClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingClass::Static => "static",
            RoutingClass::Image => "image",
            RoutingClass::Api => "api",
            RoutingClass::Document => "document",
            RoutingClass::Other => "other",
        }
    }
}

impl fmt::Display for RoutingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caching strategy applied to a routing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    CacheFirstWithTtl,
    NetworkFirstWithTimeout,
    StaleWhileRevalidate,
}

/// Semantic role of a cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    Static,
    Dynamic,
    Images,
}

impl PartitionRole {
    pub const ALL: [PartitionRole; 3] = [PartitionRole::Static, PartitionRole::Dynamic, PartitionRole::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
            PartitionRole::Images => "images",
        }
    }

    /// Partition name for this role in the given generation, e.g. `static-v3`.
    pub fn partition_name(&self, generation: &str) -> String {
        format!("{}-{}", self.as_str(), generation)
    }
}

/// Strategy binding for one routing class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    pub strategy: Strategy,
    pub partition: PartitionRole,

    /// Freshness window, required by `cache-first-with-ttl`.
    #[serde(default)]
    pub max_age_ms: Option<u64>,

    /// Network race bound, required by `network-first-with-timeout`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RoutePolicy {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_ms.map(Duration::from_millis)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Routing class → policy mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(rename = "static")]
    pub static_assets: RoutePolicy,
    pub image: RoutePolicy,
    pub api: RoutePolicy,
    pub document: RoutePolicy,
    pub other: RoutePolicy,
}

impl RouteTable {
    pub fn policy(&self, class: RoutingClass) -> &RoutePolicy {
        match class {
            RoutingClass::Static => &self.static_assets,
            RoutingClass::Image => &self.image,
            RoutingClass::Api => &self.api,
            RoutingClass::Document => &self.document,
            RoutingClass::Other => &self.other,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RoutingClass, &RoutePolicy)> {
        [
            (RoutingClass::Static, &self.static_assets),
            (RoutingClass::Image, &self.image),
            (RoutingClass::Api, &self.api),
            (RoutingClass::Document, &self.document),
            (RoutingClass::Other, &self.other),
        ]
        .into_iter()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            static_assets: RoutePolicy {
                strategy: Strategy::CacheFirst,
                partition: PartitionRole::Static,
                max_age_ms: None,
                timeout_ms: None,
            },
            image: RoutePolicy {
                strategy: Strategy::CacheFirstWithTtl,
                partition: PartitionRole::Images,
                max_age_ms: Some(24 * 60 * 60 * 1000),
                timeout_ms: None,
            },
            api: RoutePolicy {
                strategy: Strategy::NetworkFirstWithTimeout,
                partition: PartitionRole::Dynamic,
                max_age_ms: None,
                timeout_ms: Some(3_000),
            },
            document: RoutePolicy {
                strategy: Strategy::StaleWhileRevalidate,
                partition: PartitionRole::Dynamic,
                max_age_ms: None,
                timeout_ms: None,
            },
            other: RoutePolicy {
                strategy: Strategy::NetworkFirstWithTimeout,
                partition: PartitionRole::Dynamic,
                max_age_ms: None,
                timeout_ms: Some(5_000),
            },
        }
    }
}
