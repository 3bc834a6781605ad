//! Search backend seam
//!
//! The tile core talks to the search engine only through [`SearchBackend`].
//! [`ElasticBackend`] implements it over HTTP for Elasticsearch-compatible
//! `_search` endpoints; tests substitute their own implementations.

mod elastic;

pub use elastic::ElasticBackend;

use crate::aggregations::Aggregation;
use crate::error::Result;
use crate::query::Filter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Body of a `_search` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: Filter,
    #[serde(rename = "aggs", skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregations: BTreeMap<String, Aggregation>,
    /// Number of hits to return
    pub size: usize,
}

/// `_search` response.
///
/// Aggregations stay as raw JSON since their nesting depends on the request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default, rename = "_shards")]
    pub shards: ShardStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<HitsResponse>,
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShardStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub failed: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HitsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TotalHits {
    Object { value: u64, relation: String },
    Count(u64),
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value, .. } => *value,
            TotalHits::Count(n) => *n,
        }
    }
}

/// Executes search requests against an index.
///
/// Implementations must be safe to call concurrently; timeouts, pooling and
/// retries belong here, not in the tile core.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse>;

    /// Human-readable backend name
    fn backend_name(&self) -> &str;
}
