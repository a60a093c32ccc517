//! Search orchestration over the embedding service and vector index.
//!
//! Score-threshold filtering happens client-side, after the index returns its
//! unfiltered `top_k` neighbors — the filtering policy stays provider-agnostic
//! at the cost of sometimes returning fewer than `top_k` hits. Callers must
//! treat the filtered count as authoritative.

use tracing::{info, warn};

use crate::embedding::EmbeddingService;
use crate::error::{CartError, Result};
use crate::index::metadata::ProductMetadata;
use crate::index::{SearchHit, VectorIndex};

/// Comparison accepts between 2 and 5 product ids.
const COMPARE_MIN: usize = 2;
const COMPARE_MAX: usize = 5;

#[derive(Clone)]
pub struct SearchEngine {
    embedder: EmbeddingService,
    index: VectorIndex,
}

impl SearchEngine {
    pub fn new(embedder: EmbeddingService, index: VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// Embed the query, fetch `top_k` neighbors, drop hits below `min_score`.
    ///
    /// The index's descending-score order is preserved through filtering.
    pub async fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.index.query(&embedding, top_k).await?;

        let unfiltered = hits.len();
        let filtered: Vec<SearchHit> = hits.into_iter().filter(|h| h.score >= min_score).collect();

        let avg_score = if unfiltered > 0 {
            filtered.iter().map(|h| h.score as f64).sum::<f64>() / unfiltered as f64
        } else {
            0.0
        };
        info!(
            query,
            found = unfiltered,
            kept = filtered.len(),
            min_score,
            avg_score = format!("{avg_score:.3}"),
            "semantic search"
        );

        Ok(filtered)
    }

    /// Nearest neighbors of an already-indexed item.
    ///
    /// Queries `top_k + 1` to tolerate the source item appearing in its own
    /// neighbor set, then removes it and truncates. Fails with
    /// [`CartError::ItemNotFound`] when `item_id` is not in the index.
    pub async fn recommend_similar(&self, item_id: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if item_id.trim().is_empty() {
            return Err(CartError::InvalidInput("product id is required".into()));
        }

        let source = self.index.fetch(item_id).await?;
        let neighbors = self.index.query(&source.vector, top_k + 1).await?;

        let mut recommendations: Vec<SearchHit> =
            neighbors.into_iter().filter(|h| h.id != item_id).collect();
        recommendations.truncate(top_k);

        Ok(recommendations)
    }

    /// Resolve 2–5 product ids for comparison.
    ///
    /// Each id gets a best-effort single-result lookup; a per-id failure is
    /// logged and skipped rather than aborting the comparison. Fails with
    /// [`CartError::InsufficientItems`] when fewer than two ids resolve.
    pub async fn compare_items(&self, ids: &[String]) -> Result<Vec<ProductMetadata>> {
        if ids.len() < COMPARE_MIN || ids.len() > COMPARE_MAX {
            return Err(CartError::InvalidInput(format!(
                "comparison requires between {COMPARE_MIN} and {COMPARE_MAX} product ids, got {}",
                ids.len()
            )));
        }

        let mut resolved = Vec::new();
        for id in ids {
            match self.semantic_search(&format!("product_id:{id}"), 1, 0.0).await {
                Ok(hits) => match hits.into_iter().next() {
                    Some(hit) => resolved.push(hit.product),
                    None => warn!(id, "no match for comparison id"),
                },
                Err(err) => warn!(id, %err, "failed to resolve comparison id"),
            }
        }

        if resolved.len() < COMPARE_MIN {
            return Err(CartError::InsufficientItems {
                resolved: resolved.len(),
            });
        }

        Ok(resolved)
    }

    /// Single-product lookup by id token.
    pub async fn get_product(&self, id: &str) -> Result<SearchHit> {
        let hits = self.semantic_search(id, 1, 0.0).await?;
        hits.into_iter()
            .next()
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))
    }

    /// Popular products, re-ranked by rating and review volume.
    pub async fn trending(&self, limit: usize, category: Option<&str>) -> Result<Vec<SearchHit>> {
        let mut query = String::from("popular trending products");
        if let Some(category) = category {
            query.push(' ');
            query.push_str(category);
        }

        let mut hits = self.semantic_search(&query, limit, 0.0).await?;
        hits.sort_by(|a, b| {
            popularity(&b.product)
                .partial_cmp(&popularity(&a.product))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }

    /// Products within a category, with a rating floor.
    ///
    /// Over-fetches 2x because the similarity query surfaces adjacent
    /// categories too; the category filter then prunes to `limit`.
    pub async fn by_category(
        &self,
        category: &str,
        limit: usize,
        min_rating: f64,
    ) -> Result<Vec<SearchHit>> {
        if category.trim().is_empty() {
            return Err(CartError::InvalidInput("category is required".into()));
        }

        let hits = self.semantic_search(category, limit * 2, 0.0).await?;
        let needle = category.to_lowercase();

        Ok(hits
            .into_iter()
            .filter(|h| {
                h.product.category.to_lowercase().contains(&needle)
                    && h.product.rating >= min_rating
            })
            .take(limit)
            .collect())
    }
}

/// Blend of rating and log-scaled review count used for trending order.
fn popularity(product: &ProductMetadata) -> f64 {
    product.rating * 0.7 + (product.review_count as f64 + 1.0).ln() * 0.3
}
