mod helpers;

use std::sync::Arc;

use helpers::{test_vector, MockEmbedder};
use vectorcart::embedding::{EmbeddingBackend, EmbeddingService};
use vectorcart::error::CartError;

fn service(backends: Vec<Arc<MockEmbedder>>) -> EmbeddingService {
    EmbeddingService::new(
        backends
            .into_iter()
            .map(|b| b as Arc<dyn EmbeddingBackend>)
            .collect(),
    )
}

#[tokio::test]
async fn primary_success_skips_secondary() {
    let primary = Arc::new(MockEmbedder::working("primary"));
    let secondary = Arc::new(MockEmbedder::working("secondary"));
    let svc = service(vec![primary.clone(), secondary.clone()]);

    let vector = svc.embed("wireless headphones").await.unwrap();

    assert_eq!(vector, test_vector("wireless headphones"));
    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 0);
}

#[tokio::test]
async fn fallback_uses_secondary_when_primary_fails() {
    let primary = Arc::new(MockEmbedder::failing("primary"));
    let secondary = Arc::new(MockEmbedder::working("secondary"));
    let svc = service(vec![primary.clone(), secondary.clone()]);

    let vector = svc.embed("usb-c cable").await.unwrap();

    assert_eq!(vector, test_vector("usb-c cable"));
    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 1);
}

#[tokio::test]
async fn exhausted_chain_reports_primary_error() {
    let primary = Arc::new(MockEmbedder::failing("primary"));
    let secondary = Arc::new(MockEmbedder::failing("secondary"));
    let svc = service(vec![primary, secondary]);

    let err = svc.embed("anything").await.unwrap_err();

    match err {
        CartError::EmbeddingUnavailable(msg) => {
            assert!(msg.contains("primary is down"), "got: {msg}");
        }
        other => panic!("expected EmbeddingUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn inputs_that_normalize_identically_make_identical_calls() {
    let backend = Arc::new(MockEmbedder::working("primary"));
    let svc = service(vec![backend.clone()]);

    let a = svc.embed("  Wireless   HEADPHONES ").await.unwrap();
    let b = svc.embed("wireless headphones").await.unwrap();

    assert_eq!(a, b);
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(calls[0], "wireless headphones");
}

#[tokio::test]
async fn empty_input_is_rejected_before_any_provider_call() {
    let backend = Arc::new(MockEmbedder::working("primary"));
    let svc = service(vec![backend.clone()]);

    assert!(matches!(svc.embed("").await, Err(CartError::InvalidInput(_))));
    assert!(matches!(svc.embed("   ").await, Err(CartError::InvalidInput(_))));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_preserves_input_order_across_chunks() {
    let backend = Arc::new(MockEmbedder::working("primary"));
    let svc = service(vec![backend.clone()]);

    // 7 texts spans two chunks of 5.
    let texts: Vec<String> = (0..7).map(|i| format!("product number {i}")).collect();
    let vectors = svc.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), 7);
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector, &test_vector(text));
    }
    assert_eq!(backend.call_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn batch_fails_atomically_on_a_bad_item() {
    let backend = Arc::new(MockEmbedder::failing_on("primary", "poison pill"));
    let svc = service(vec![backend]);

    let texts = vec![
        "good one".to_string(),
        "Poison PILL".to_string(),
        "another good one".to_string(),
    ];
    let result = svc.embed_batch(&texts).await;

    assert!(matches!(result, Err(CartError::EmbeddingUnavailable(_))));
}

#[tokio::test]
async fn embed_product_concatenates_descriptive_fields() {
    let backend = Arc::new(MockEmbedder::working("primary"));
    let svc = service(vec![backend.clone()]);

    let raw: vectorcart::index::metadata::RawProduct = serde_json::from_value(serde_json::json!({
        "product_name": "Solar Lantern",
        "category": "Outdoor",
        "brand": "Lumo",
        "about_product": "Rechargeable camping light",
    }))
    .unwrap();

    svc.embed_product(&raw).await.unwrap();

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls[0], "solar lantern outdoor rechargeable camping light lumo");
}
