//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingBackend`] trait and the [`EmbeddingService`] that
//! tries an ordered chain of hosted providers — Hugging Face feature
//! extraction first, Google `text-embedding-004` as fallback. A provider
//! outage degrades into extra latency rather than a hard search outage.

pub mod google;
pub mod huggingface;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{CartError, Result};
use crate::index::metadata::RawProduct;

/// Maximum text length fed to a provider, in characters. Bounds provider cost
/// and avoids provider-side truncation surprises.
pub const MAX_TEXT_LEN: usize = 512;

/// Batch embedding processes texts in chunks of this size to respect provider
/// rate limits.
const CHUNK_SIZE: usize = 5;

/// Pause between batch chunks.
const CHUNK_DELAY: Duration = Duration::from_millis(100);

/// A single hosted embedding provider.
///
/// Implementations embed already-preprocessed text; normalization happens once
/// in [`EmbeddingService::embed`] so every backend sees identical input.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Normalize raw text before embedding.
///
/// Strips characters outside a conservative allowed set (word characters and
/// basic punctuation), collapses whitespace runs, lowercases, and truncates to
/// [`MAX_TEXT_LEN`] characters. Fails with [`CartError::InvalidInput`] if the
/// input is empty or nothing embeddable remains — embedding an empty string
/// would corrupt similarity rankings downstream.
pub fn preprocess(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(CartError::InvalidInput("text must be a non-empty string".into()));
    }

    let filtered: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric()
                || c == '_'
                || c.is_whitespace()
                || matches!(c, '.' | ',' | '!' | '?' | '-')
            {
                c
            } else {
                ' '
            }
        })
        .collect();

    let clean: String = filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(MAX_TEXT_LEN)
        .collect();

    if clean.is_empty() {
        return Err(CartError::InvalidInput(
            "no valid text content to embed after preprocessing".into(),
        ));
    }

    Ok(clean)
}

/// Multi-provider embedding service.
///
/// Holds an ordered list of backends tried in sequence. The fallback order and
/// exhaustion condition live here, not in nested error handling, so they are
/// testable in isolation.
#[derive(Clone)]
pub struct EmbeddingService {
    backends: Arc<Vec<Arc<dyn EmbeddingBackend>>>,
}

impl EmbeddingService {
    /// Build a service over the given backends, tried in order.
    pub fn new(backends: Vec<Arc<dyn EmbeddingBackend>>) -> Self {
        Self {
            backends: Arc::new(backends),
        }
    }

    /// Embed a single text, trying each backend in order.
    ///
    /// Returns [`CartError::EmbeddingUnavailable`] carrying the primary
    /// backend's error message when every backend fails.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let clean = preprocess(text)?;

        let mut primary_error: Option<String> = None;
        for backend in self.backends.iter() {
            match backend.embed(&clean).await {
                Ok(vector) => {
                    debug!(provider = backend.name(), dims = vector.len(), "embedded text");
                    return Ok(vector);
                }
                Err(err) => {
                    warn!(provider = backend.name(), %err, "embedding backend failed");
                    primary_error.get_or_insert_with(|| err.to_string());
                }
            }
        }

        Err(CartError::EmbeddingUnavailable(
            primary_error.unwrap_or_else(|| "no embedding backends configured".into()),
        ))
    }

    /// Embed a batch of texts.
    ///
    /// Texts are processed in chunks of [`CHUNK_SIZE`]; requests within a chunk
    /// run concurrently, with a [`CHUNK_DELAY`] pause between chunks. The batch
    /// fails atomically: the first failing item aborts the whole call, so a
    /// partial result is never silently returned.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for (chunk_idx, chunk) in texts.chunks(CHUNK_SIZE).enumerate() {
            if chunk_idx > 0 {
                tokio::time::sleep(CHUNK_DELAY).await;
            }

            let handles: Vec<_> = chunk
                .iter()
                .map(|text| {
                    let service = self.clone();
                    let text = text.clone();
                    tokio::spawn(async move { service.embed(&text).await })
                })
                .collect();

            // Awaiting in spawn order keeps results aligned with input order.
            for handle in handles {
                let vector = handle
                    .await
                    .map_err(|e| CartError::EmbeddingUnavailable(format!("embedding task failed: {e}")))??;
                embeddings.push(vector);
            }
        }

        Ok(embeddings)
    }

    /// Embed a product record by concatenating its descriptive text fields.
    ///
    /// Field order is fixed (name, category, description, brand,
    /// specifications); empty fields are skipped.
    pub async fn embed_product(&self, product: &RawProduct) -> Result<Vec<f32>> {
        let parts = [
            product.name_text(),
            product.category_text(),
            product.description_text(),
            product.brand_text(),
            product.specifications_text(),
        ];

        let combined = parts
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        self.embed(&combined).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_collapses_whitespace_and_lowercases() {
        let clean = preprocess("  Wireless\t\tBluetooth\n Headphones  ").unwrap();
        assert_eq!(clean, "wireless bluetooth headphones");
    }

    #[test]
    fn preprocess_strips_disallowed_characters() {
        let clean = preprocess("50% off! ★Best★ deal, right?").unwrap();
        assert_eq!(clean, "50 off! best deal, right?");
    }

    #[test]
    fn preprocess_keeps_basic_punctuation() {
        let clean = preprocess("USB-C cable, 2m. Works!").unwrap();
        assert_eq!(clean, "usb-c cable, 2m. works!");
    }

    #[test]
    fn preprocess_truncates_to_max_len() {
        let long = "a".repeat(2000);
        let clean = preprocess(&long).unwrap();
        assert_eq!(clean.len(), MAX_TEXT_LEN);
    }

    #[test]
    fn preprocess_rejects_empty_input() {
        assert!(matches!(preprocess(""), Err(CartError::InvalidInput(_))));
        assert!(matches!(preprocess("   \t\n"), Err(CartError::InvalidInput(_))));
    }

    #[test]
    fn preprocess_rejects_input_that_normalizes_to_nothing() {
        assert!(matches!(preprocess("★☆♥♦"), Err(CartError::InvalidInput(_))));
    }

    #[test]
    fn differing_raw_inputs_can_normalize_identically() {
        let a = preprocess("Wireless  HEADPHONES").unwrap();
        let b = preprocess("wireless headphones").unwrap();
        assert_eq!(a, b);
    }
}
