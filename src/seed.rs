//! Bulk-load pipeline: raw product records → embeddings → index upsert.
//!
//! Consumes the JSON produced by the ingestion tool (a flat array of raw
//! product records with heterogeneous field names; canonicalization happens in
//! the index layer, not here). Per-record embedding failures are logged and
//! skipped so one bad record never aborts a seeding run.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::embedding::EmbeddingService;
use crate::index::metadata::{EmbeddedProduct, RawProduct};
use crate::index::VectorIndex;

/// Pause between per-product embedding calls to stay under provider rate limits.
const SEED_ITEM_DELAY: Duration = Duration::from_millis(200);

/// Embed every product in `path` and upsert the results.
pub async fn seed_from_file(
    path: &Path,
    embedder: &EmbeddingService,
    index: &VectorIndex,
) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let products: Vec<RawProduct> =
        serde_json::from_str(&contents).context("failed to parse product JSON")?;

    let total = products.len();
    if total == 0 {
        println!("No products to seed.");
        return Ok(());
    }

    println!("Generating embeddings for {total} products...");

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let mut embedded = Vec::with_capacity(total);
    for (i, product) in products.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(SEED_ITEM_DELAY).await;
        }

        match embedder.embed_product(&product).await {
            Ok(embedding) => embedded.push(EmbeddedProduct { raw: product, embedding }),
            Err(err) => {
                warn!(id = %product.resolved_id(i), %err, "skipping product, embedding failed");
            }
        }
        pb.inc(1);
    }
    pb.finish();

    info!(embedded = embedded.len(), skipped = total - embedded.len(), "embedding pass done");

    if embedded.is_empty() {
        anyhow::bail!("no products could be embedded — check provider credentials");
    }

    index
        .store_products(&embedded)
        .await
        .context("failed to store embeddings")?;

    let stats = index.stats().await.context("failed to read index stats")?;
    println!("Index statistics:");
    println!("  - Total vectors: {}", stats.total_count);
    println!("  - Index fullness: {:.2}%", stats.fullness_ratio * 100.0);
    println!("  - Dimension: {}", stats.dimension);

    Ok(())
}
