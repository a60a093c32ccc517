#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use vectorcart::embedding::EmbeddingBackend;
use vectorcart::error::{CartError, Result};
use vectorcart::index::metadata::ProductMetadata;
use vectorcart::index::{IndexBackend, IndexStats, IndexedItem, SearchHit};
use vectorcart::synthesis::GenerativeBackend;

/// Deterministic embedding derived from the input text. Same normalized text
/// always yields the same vector.
pub fn test_vector(text: &str) -> Vec<f32> {
    let seed: u32 = text.bytes().map(u32::from).sum();
    (0..8).map(|i| ((seed + i) % 97) as f32 / 97.0).collect()
}

/// Recording embedding backend. Fails every call when `fail` is set, or just
/// the call matching `fail_on`.
pub struct MockEmbedder {
    pub name: &'static str,
    pub fail: bool,
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn working(name: &'static str) -> Self {
        Self {
            name,
            fail: false,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::working(name)
        }
    }

    pub fn failing_on(name: &'static str, text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
            ..Self::working(name)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail || self.fail_on.as_deref() == Some(text) {
            return Err(CartError::EmbeddingUnavailable(format!(
                "{} is down",
                self.name
            )));
        }
        Ok(test_vector(text))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Index backend that answers every query with the same scripted hit list
/// (truncated to `top_k`) and stores upserted items for fetch.
pub struct ScriptedIndex {
    pub hits: Vec<SearchHit>,
    pub items: Mutex<HashMap<String, IndexedItem>>,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl ScriptedIndex {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            items: Mutex::new(HashMap::new()),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_item(self, item: IndexedItem) -> Self {
        self.items.lock().unwrap().insert(item.id.clone(), item);
        self
    }
}

#[async_trait]
impl IndexBackend for ScriptedIndex {
    async fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        self.batch_sizes.lock().unwrap().push(items.len());
        let mut stored = self.items.lock().unwrap();
        for item in items {
            stored.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexedItem>> {
        Ok(self.items.lock().unwrap().get(id).cloned())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let items = self.items.lock().unwrap();
        Ok(IndexStats {
            total_count: items.len() as u64,
            fullness_ratio: 0.0,
            dimension: items.values().next().map(|i| i.vector.len()).unwrap_or(0),
        })
    }
}

/// Index backend that pops one pre-queued response per query, for flows that
/// issue several lookups (comparison resolution).
pub struct QueuedIndex {
    pub responses: Mutex<VecDeque<Result<Vec<SearchHit>>>>,
}

impl QueuedIndex {
    pub fn new(responses: Vec<Result<Vec<SearchHit>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl IndexBackend for QueuedIndex {
    async fn upsert(&self, _items: &[IndexedItem]) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<SearchHit>> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch(&self, _id: &str) -> Result<Option<IndexedItem>> {
        Ok(None)
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_count: 0,
            fullness_ratio: 0.0,
            dimension: 0,
        })
    }
}

/// Generative backend returning a canned response, or failing when none is set.
pub struct MockModel {
    pub response: Option<String>,
    pub calls: Mutex<usize>,
}

impl MockModel {
    pub fn answering(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerativeBackend for MockModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.response
            .clone()
            .ok_or_else(|| CartError::MalformedResponse("mock model failure".into()))
    }
}

/// A metadata record with the fields most tests care about.
pub fn sample_product(title: &str, category: &str, rating: f64, review_count: u64) -> ProductMetadata {
    ProductMetadata {
        title: title.to_string(),
        category: category.to_string(),
        brand: "Acme".to_string(),
        price: 499.0,
        original_price: 999.0,
        discount: 50.0,
        rating,
        review_count,
        description: format!("{title} description"),
        image: String::new(),
        url: String::new(),
        features: "durable, lightweight".to_string(),
    }
}

pub fn sample_hit(id: &str, score: f32) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        score,
        product: sample_product(id, "Electronics", 4.2, 120),
    }
}
