//! Vector index access layer.
//!
//! [`VectorIndex`] wraps an [`IndexBackend`] (the remote ANN service) and owns
//! the batching, throttling, and canonicalization policy around it. The
//! serving path treats stored items as read-only; updates are full re-upserts
//! keyed by id, with last-write-wins consistency left to the service.

pub mod metadata;
pub mod pinecone;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CartError, Result};
use metadata::{canonicalize, EmbeddedProduct, ProductMetadata};

/// Service-imposed ceiling on vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

/// Pause between upsert batches to avoid throttling.
const UPSERT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// An entity stored in the vector index. Immutable once written; the raw
/// vector is never returned to search callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedItem {
    pub id: String,
    #[serde(rename = "values")]
    pub vector: Vec<f32>,
    pub metadata: ProductMetadata,
}

/// One nearest-neighbor match. Transient — produced per query, discarded after
/// the response is sent. Higher score = more similar, treated as ∈ [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub product: ProductMetadata,
}

/// Read-only index diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
    #[serde(rename = "fullnessRatio")]
    pub fullness_ratio: f64,
    pub dimension: usize,
}

/// The remote ANN index service.
///
/// Implementations establish their connection lazily on first use and reuse
/// it. `query` must return hits in service-native order (descending score).
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Upsert one batch of items. Callers handle batching and throttling.
    async fn upsert(&self, items: &[IndexedItem]) -> Result<()>;

    /// K-nearest-neighbor query with metadata, vectors excluded.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    /// Fetch a single item by id. `None` when the id is absent.
    async fn fetch(&self, id: &str) -> Result<Option<IndexedItem>>;

    /// Aggregate index statistics.
    async fn stats(&self) -> Result<IndexStats>;
}

/// Batching and canonicalization policy over an [`IndexBackend`].
#[derive(Clone)]
pub struct VectorIndex {
    backend: Arc<dyn IndexBackend>,
}

impl VectorIndex {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    /// Upsert items in batches of [`UPSERT_BATCH_SIZE`].
    ///
    /// Batch *i* completes before batch *i+1* is sent, so later writes never
    /// race earlier writes to overlapping ids; a short delay between batches
    /// keeps the service from throttling the load.
    pub async fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        let total_batches = items.len().div_ceil(UPSERT_BATCH_SIZE);
        for (i, batch) in items.chunks(UPSERT_BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(UPSERT_BATCH_DELAY).await;
            }
            self.backend.upsert(batch).await?;
            info!(batch = i + 1, total = total_batches, size = batch.len(), "uploaded batch");
        }
        Ok(())
    }

    /// Canonicalize embedded raw products and upsert them.
    pub async fn store_products(&self, products: &[EmbeddedProduct]) -> Result<()> {
        let items: Vec<IndexedItem> = products
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedItem {
                id: p.raw.resolved_id(i),
                vector: p.embedding.clone(),
                metadata: canonicalize(&p.raw),
            })
            .collect();

        info!(count = items.len(), "storing product embeddings");
        self.upsert(&items).await
    }

    /// Up to `top_k` nearest items, in the service's descending-score order.
    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.backend.query(vector, top_k).await
    }

    /// Fetch an item by id, failing with [`CartError::ItemNotFound`] when absent.
    pub async fn fetch(&self, id: &str) -> Result<IndexedItem> {
        self.backend
            .fetch(id)
            .await?
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.backend.stats().await
    }
}
