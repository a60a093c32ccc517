//! Pinecone REST backend for the vector index.
//!
//! The data-plane host is resolved from the control plane once, on first use,
//! and cached for the life of the process (idempotent initialization). All
//! operations share one HTTP client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

use super::{IndexBackend, IndexStats, IndexedItem, SearchHit};
use crate::config::IndexConfig;
use crate::error::{CartError, Result};
use crate::index::metadata::ProductMetadata;

pub struct PineconeBackend {
    client: Client,
    api_key: String,
    index_name: String,
    controller_url: String,
    host: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: ProductMetadata,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, IndexedItem>,
}

#[derive(Debug, Deserialize)]
struct DescribeStatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: u64,
    #[serde(rename = "indexFullness", default)]
    index_fullness: f64,
    #[serde(default)]
    dimension: usize,
}

impl PineconeBackend {
    pub fn new(config: &IndexConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            index_name: config.index_name.clone(),
            controller_url: config.controller_url.clone(),
            host: OnceCell::new(),
        })
    }

    /// Resolve (once) and cache the data-plane base URL for the index.
    async fn base_url(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", self.controller_url, self.index_name);
                let response = self
                    .client
                    .get(&url)
                    .header("Api-Key", &self.api_key)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    return Err(CartError::Index(format!(
                        "failed to describe index {}: {status}",
                        self.index_name
                    )));
                }

                let described: DescribeIndexResponse = response
                    .json()
                    .await
                    .map_err(|e| CartError::MalformedResponse(format!("describe index: {e}")))?;

                info!(index = %self.index_name, host = %described.host, "connected to index");
                Ok(format!("https://{}", described.host))
            })
            .await
            .map(String::as_str)
    }

    async fn check(response: reqwest::Response, op: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CartError::Index(format!("{op} failed: {status}: {body}")))
    }
}

#[async_trait]
impl IndexBackend for PineconeBackend {
    async fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        let base = self.base_url().await?;
        let body = serde_json::json!({ "vectors": items });

        let response = self
            .client
            .post(format!("{base}/vectors/upsert"))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::check(response, "upsert").await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let base = self.base_url().await?;
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });

        let response = self
            .client
            .post(format!("{base}/query"))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: QueryResponse = Self::check(response, "query")
            .await?
            .json()
            .await
            .map_err(|e| CartError::MalformedResponse(format!("query response: {e}")))?;

        // Service-native ordering (descending score) is preserved as-is.
        Ok(parsed
            .matches
            .into_iter()
            .map(|m| SearchHit {
                id: m.id,
                score: m.score,
                product: m.metadata,
            })
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexedItem>> {
        let base = self.base_url().await?;

        let response = self
            .client
            .get(format!("{base}/vectors/fetch"))
            .header("Api-Key", &self.api_key)
            .query(&[("ids", id)])
            .send()
            .await?;

        let mut parsed: FetchResponse = Self::check(response, "fetch")
            .await?
            .json()
            .await
            .map_err(|e| CartError::MalformedResponse(format!("fetch response: {e}")))?;

        Ok(parsed.vectors.remove(id))
    }

    async fn stats(&self) -> Result<IndexStats> {
        let base = self.base_url().await?;

        let response = self
            .client
            .post(format!("{base}/describe_index_stats"))
            .header("Api-Key", &self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let parsed: DescribeStatsResponse = Self::check(response, "stats")
            .await?
            .json()
            .await
            .map_err(|e| CartError::MalformedResponse(format!("stats response: {e}")))?;

        Ok(IndexStats {
            total_count: parsed.total_vector_count,
            fullness_ratio: parsed.index_fullness,
            dimension: parsed.dimension,
        })
    }
}
