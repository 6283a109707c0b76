//! Benchmark collection resources.

use serde::{Deserialize, Serialize};

use crate::jobs::BenchmarkConfig;
use crate::page::Page;
use crate::resource::Resource;

/// Client-supplied definition of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A stored collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResource {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(flatten)]
    pub config: CollectionConfig,
}

impl CollectionResource {
    /// Returns a copy without the benchmark list.
    #[must_use]
    pub fn summary(&self) -> Self {
        let mut collection = self.clone();
        collection.config.benchmarks.clear();
        collection
    }
}

/// Paged list of collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResourceList {
    #[serde(flatten)]
    pub page: Page,
    pub items: Vec<CollectionResource>,
}
