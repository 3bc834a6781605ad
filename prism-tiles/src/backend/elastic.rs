//! Elasticsearch `_search` client

use super::{SearchBackend, SearchRequest, SearchResponse};
use crate::config::BackendConfig;
use crate::error::{Result, TileError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of characters of an error body carried into the error message
const MAX_ERROR_BODY: usize = 512;

pub struct ElasticBackend {
    client: Client,
    url: Url,
}

impl ElasticBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        let url = Url::parse(&config.url)
            .map_err(|e| TileError::config(format!("backend url `{}`: {}", config.url, e)))?;
        if url.cannot_be_a_base() {
            return Err(TileError::config(format!(
                "backend url `{}` cannot carry a path",
                config.url
            )));
        }

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// `<base>/<index>/_search`, with the index percent-encoded as one path segment
    fn search_url(&self, index: &str) -> Result<Url> {
        if index.is_empty() || index == "." || index == ".." {
            return Err(TileError::config(format!(
                "index name `{}` is not a path segment",
                index
            )));
        }

        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| TileError::config(format!("backend url `{}` cannot carry a path", self.url)))?
            .pop_if_empty()
            .push(index)
            .push("_search");
        Ok(url)
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let response = self
            .client
            .post(self.search_url(index)?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TileError::Backend(format!(
                "search on `{}` failed ({}): {}",
                index,
                status,
                error_reason(&body)
            )));
        }

        let body = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&body)?;

        if parsed.timed_out {
            return Err(TileError::Backend(format!(
                "search on `{}` timed out after {}ms",
                index, parsed.took
            )));
        }
        if parsed.shards.failed > 0 {
            warn!(
                index,
                failed = parsed.shards.failed,
                total = parsed.shards.total,
                "search returned partial results"
            );
        }

        debug!(index, took_ms = parsed.took, "search completed");
        Ok(parsed)
    }

    fn backend_name(&self) -> &str {
        "elasticsearch"
    }
}

/// Pull `error.reason` out of an Elasticsearch error body, falling back to the raw text
fn error_reason(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let reason = parsed.as_ref().and_then(|v| match &v["error"] {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("reason")
            .and_then(Value::as_str)
            .map(|reason| match obj.get("type").and_then(Value::as_str) {
                Some(kind) => format!("{}: {}", kind, reason),
                None => reason.to_string(),
            }),
        _ => None,
    });

    reason.unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect())
}
