mod helpers;

use std::sync::Arc;

use helpers::{sample_hit, MockEmbedder, QueuedIndex, ScriptedIndex};
use vectorcart::embedding::{EmbeddingBackend, EmbeddingService};
use vectorcart::error::CartError;
use vectorcart::index::metadata::ProductMetadata;
use vectorcart::index::{IndexBackend, IndexedItem, VectorIndex};
use vectorcart::search::SearchEngine;

fn engine(backend: Arc<dyn IndexBackend>) -> SearchEngine {
    let embedder = EmbeddingService::new(vec![
        Arc::new(MockEmbedder::working("primary")) as Arc<dyn EmbeddingBackend>
    ]);
    SearchEngine::new(embedder, VectorIndex::new(backend))
}

#[tokio::test]
async fn min_score_filters_low_hits_and_preserves_order() {
    let index = Arc::new(ScriptedIndex::new(vec![
        sample_hit("hp-1", 0.81),
        sample_hit("hp-2", 0.52),
        sample_hit("hp-3", 0.30),
    ]));
    let engine = engine(index);

    let hits = engine
        .semantic_search("wireless bluetooth headphones", 3, 0.4)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "hp-1");
    assert_eq!(hits[1].id, "hp-2");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits.iter().all(|h| h.score >= 0.4));
}

#[tokio::test]
async fn zero_min_score_keeps_everything() {
    let index = Arc::new(ScriptedIndex::new(vec![
        sample_hit("a", 0.9),
        sample_hit("b", 0.1),
    ]));
    let hits = engine(index).semantic_search("query", 10, 0.0).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn recommend_excludes_the_source_item() {
    // 6-nearest query (top_k + 1) returns the source itself at position 2.
    let index = Arc::new(
        ScriptedIndex::new(vec![
            sample_hit("n1", 0.95),
            sample_hit("n2", 0.90),
            sample_hit("sku-123", 0.89),
            sample_hit("n3", 0.85),
            sample_hit("n4", 0.80),
            sample_hit("n5", 0.75),
        ])
        .with_item(IndexedItem {
            id: "sku-123".to_string(),
            vector: vec![0.1; 8],
            metadata: ProductMetadata::default(),
        }),
    );
    let engine = engine(index);

    let recs = engine.recommend_similar("sku-123", 5).await.unwrap();

    assert!(recs.len() <= 5);
    assert!(recs.iter().all(|h| h.id != "sku-123"));
    let ids: Vec<&str> = recs.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["n1", "n2", "n3", "n4", "n5"]);
}

#[tokio::test]
async fn recommend_truncates_to_k_when_source_is_absent() {
    let index = Arc::new(
        ScriptedIndex::new((0..6).map(|i| sample_hit(&format!("n{i}"), 0.9)).collect())
            .with_item(IndexedItem {
                id: "seed".to_string(),
                vector: vec![0.5; 8],
                metadata: ProductMetadata::default(),
            }),
    );

    let recs = engine(index).recommend_similar("seed", 5).await.unwrap();
    assert_eq!(recs.len(), 5);
}

#[tokio::test]
async fn recommend_unknown_id_fails_not_found() {
    let index = Arc::new(ScriptedIndex::new(vec![]));
    let err = engine(index).recommend_similar("ghost", 5).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn compare_validates_id_count_before_any_lookup() {
    let index = Arc::new(ScriptedIndex::new(vec![sample_hit("a", 0.9)]));
    let engine = engine(index);

    let one = vec!["a".to_string()];
    assert!(matches!(
        engine.compare_items(&one).await,
        Err(CartError::InvalidInput(_))
    ));

    let six: Vec<String> = (0..6).map(|i| format!("p{i}")).collect();
    assert!(matches!(
        engine.compare_items(&six).await,
        Err(CartError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn compare_with_one_resolvable_id_is_insufficient() {
    let index = Arc::new(QueuedIndex::new(vec![
        Ok(vec![sample_hit("a", 0.9)]),
        Ok(vec![]),
        Err(CartError::Index("connection reset".into())),
    ]));
    let engine = engine(index);

    let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let err = engine.compare_items(&ids).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientItems { resolved: 1 }));
}

#[tokio::test]
async fn compare_skips_unresolvable_ids_and_succeeds_with_two() {
    let index = Arc::new(QueuedIndex::new(vec![
        Ok(vec![sample_hit("a", 0.9)]),
        Ok(vec![]),
        Ok(vec![sample_hit("c", 0.8)]),
    ]));
    let engine = engine(index);

    let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let products = engine.compare_items(&ids).await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].title, "a");
    assert_eq!(products[1].title, "c");
}

#[tokio::test]
async fn get_product_fails_when_nothing_matches() {
    let index = Arc::new(ScriptedIndex::new(vec![]));
    let err = engine(index).get_product("missing").await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(_)));
}

#[tokio::test]
async fn trending_reranks_by_rating_and_review_volume() {
    let mut low = sample_hit("low", 0.9);
    low.product.rating = 3.0;
    low.product.review_count = 10;
    let mut high = sample_hit("high", 0.5);
    high.product.rating = 4.8;
    high.product.review_count = 5000;

    let index = Arc::new(ScriptedIndex::new(vec![low, high]));
    let hits = engine(index).trending(10, None).await.unwrap();

    assert_eq!(hits[0].id, "high");
    assert_eq!(hits[1].id, "low");
}

#[tokio::test]
async fn by_category_applies_category_and_rating_filters() {
    let mut electronics = sample_hit("tv", 0.9);
    electronics.product.category = "Home Electronics".into();
    electronics.product.rating = 4.5;
    let mut low_rated = sample_hit("radio", 0.8);
    low_rated.product.category = "Electronics".into();
    low_rated.product.rating = 2.0;
    let mut other = sample_hit("sofa", 0.7);
    other.product.category = "Furniture".into();
    other.product.rating = 4.9;

    let index = Arc::new(ScriptedIndex::new(vec![electronics, low_rated, other]));
    let hits = engine(index).by_category("electronics", 10, 3.0).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "tv");
}
