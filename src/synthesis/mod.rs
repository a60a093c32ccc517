//! Response synthesis — turning retrieved items into user-facing explanations.
//!
//! Each operation follows the same shape: build a grounding prompt from the
//! retrieved items, make a single model call, parse the structured output, and
//! fall back to a deterministic template on any call or parse failure. There
//! are no retries — bounded latency beats retry-induced tail latency on a
//! user-facing search path — and degradation is observable but never surfaces
//! as an error to the caller.

pub mod gemini;
pub mod parse;

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::index::metadata::ProductMetadata;
use crate::index::SearchHit;

/// Word bounds enforced on model-written summaries.
const SUMMARY_MIN_WORDS: usize = 18;
const SUMMARY_MAX_WORDS: usize = 20;

/// A hosted generative model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// One prompt in, the model's raw text out.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Per-item recommendation attached to every search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub reason: String,
    #[serde(rename = "keyBenefits")]
    pub key_benefits: String,
}

impl Recommendation {
    /// Generic placeholder for positions the model did not cover.
    fn placeholder() -> Self {
        Self {
            reason: "Good match for your search criteria".into(),
            key_benefits: "Quality product with competitive features".into(),
        }
    }
}

/// A search hit augmented with its recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub recommendation: Recommendation,
}

/// The synthesized answer for a search request.
///
/// Invariant: `products` has exactly one entry per input hit, each with a
/// recommendation — synthesized from the model when available, else a
/// deterministic placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedResponse {
    pub query: String,
    pub explanation: String,
    pub products: Vec<RecommendedHit>,
    pub summary: String,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    /// Set when a deterministic fallback replaced model output. Logged, not
    /// part of the wire contract.
    #[serde(skip)]
    pub degraded: bool,
}

/// Model comparison across 2–5 products. Indices are 0-based positions into
/// the compared item list.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    #[serde(rename = "bestOverall")]
    pub best_overall: usize,
    #[serde(rename = "bestPrice")]
    pub best_price: usize,
    #[serde(rename = "bestRated")]
    pub best_rated: usize,
    pub comparison: String,
    pub recommendation: String,
}

/// Structured answer we ask the model to produce for a search.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelAnswer {
    explanation: String,
    recommendations: Vec<ModelRecommendation>,
    summary: String,
}

#[derive(Debug, Deserialize)]
struct ModelRecommendation {
    /// Models answer with a number or a numeric string; coerced later.
    #[serde(rename = "productIndex", default)]
    product_index: Value,
    #[serde(default)]
    reason: String,
    #[serde(rename = "keyBenefits", default)]
    key_benefits: String,
}

#[derive(Clone)]
pub struct ResponseSynthesizer {
    model: Arc<dyn GenerativeBackend>,
}

impl ResponseSynthesizer {
    pub fn new(model: Arc<dyn GenerativeBackend>) -> Self {
        Self { model }
    }

    /// Explain a set of search hits.
    ///
    /// Empty `hits` short-circuits to a deterministic no-results response
    /// without a model call. Never fails: model and parse errors route to a
    /// deterministic template built from the items' own fields.
    pub async fn explain_results(&self, query: &str, hits: &[SearchHit]) -> SynthesizedResponse {
        if hits.is_empty() {
            return SynthesizedResponse {
                query: query.to_string(),
                explanation: "I couldn't find any products matching your query. Please try with different keywords.".into(),
                products: Vec::new(),
                summary: "No products found".into(),
                total_results: 0,
                degraded: false,
            };
        }

        let prompt = build_search_prompt(query, hits);

        let (answer, degraded) = match self.model.generate(&prompt).await {
            Ok(text) => match parse_answer(&text) {
                Some(answer) => (answer, false),
                None => {
                    warn!(query, "unparsable model output, using fallback template");
                    (fallback_answer(hits), true)
                }
            },
            Err(err) => {
                warn!(query, %err, "model call failed, using fallback template");
                (model_failure_answer(hits), true)
            }
        };

        let products = attach_recommendations(hits, &answer);

        SynthesizedResponse {
            query: query.to_string(),
            explanation: answer.explanation,
            products,
            summary: answer.summary,
            total_results: hits.len(),
            degraded,
        }
    }

    /// 18–20 word product summary, enforced post hoc.
    pub async fn summarize_item(&self, item: &ProductMetadata) -> String {
        let prompt = build_summary_prompt(item);

        match self.model.generate(&prompt).await {
            Ok(text) => enforce_word_bounds(text.trim()),
            Err(err) => {
                warn!(title = %item.title, %err, "summary model call failed");
                format!(
                    "Highly rated {} with {}/5 stars from {} satisfied customers offering excellent value.",
                    item.category, item.rating, item.review_count
                )
            }
        }
    }

    /// Compare products (caller validates length ≥ 2).
    ///
    /// On call or parse failure returns an all-zero-index deterministic
    /// comparison rather than an error.
    pub async fn compare(&self, items: &[ProductMetadata]) -> ComparisonResult {
        let prompt = build_comparison_prompt(items);

        let parsed: Option<Value> = match self.model.generate(&prompt).await {
            Ok(text) => parse::parse_json_object(&text),
            Err(err) => {
                warn!(%err, "comparison model call failed");
                None
            }
        };

        match parsed {
            Some(obj) => ComparisonResult {
                best_overall: value_to_index(obj.get("bestOverall")),
                best_price: value_to_index(obj.get("bestPrice")),
                best_rated: value_to_index(obj.get("bestRated")),
                comparison: string_field(&obj, "comparison", fallback_comparison_text),
                recommendation: string_field(&obj, "recommendation", fallback_recommendation_text),
            },
            None => ComparisonResult {
                best_overall: 0,
                best_price: 0,
                best_rated: 0,
                comparison: fallback_comparison_text().into(),
                recommendation: fallback_recommendation_text().into(),
            },
        }
    }
}

// ── Prompt construction ───────────────────────────────────────────────────────

fn build_search_prompt(query: &str, hits: &[SearchHit]) -> String {
    let mut products_info = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let p = &hit.product;
        let _ = write!(
            products_info,
            "\nProduct {}:\n\
             - Title: {}\n\
             - Category: {}\n\
             - Brand: {}\n\
             - Price: ₹{}\n\
             - Original Price: ₹{}\n\
             - Discount: {}%\n\
             - Rating: {}/5\n\
             - Review Count: {}\n\
             - Description: {}\n\
             - Features: {}\n\
             - Similarity Score: {:.3}\n",
            i + 1,
            p.title,
            p.category,
            p.brand,
            p.price,
            p.original_price,
            p.discount,
            p.rating,
            p.review_count,
            p.description,
            p.features,
            hit.score,
        );
    }

    format!(
        r#"You are a helpful AI shopping assistant for VectorCart. A user searched for: "{query}"

Here are the most relevant products found based on semantic similarity:
{products_info}

Please provide:
1. A compelling explanation (2-3 sentences) of why these products match the user's query
2. For each product, provide a brief recommendation explaining why it's a good choice
3. Generate a concise 18-20 word summary highlighting the key benefits based on ratings and features

Format your response as a single JSON object with the following structure:
{{
  "explanation": "Overall explanation of why these products match the query",
  "recommendations": [
    {{
      "productIndex": 0,
      "reason": "Why this specific product is recommended",
      "keyBenefits": "Main selling points"
    }}
  ],
  "summary": "18-20 word summary of all products highlighting ratings and key features"
}}

Important guidelines:
- Keep recommendations concise but informative
- Focus on actual product features and ratings
- Make the summary exactly 18-20 words
- Be honest about product quality based on ratings
- Consider price-to-value ratio in recommendations"#
    )
}

fn build_summary_prompt(item: &ProductMetadata) -> String {
    format!(
        "Generate a concise 18-20 word summary of this product based on its information:\n\n\
         Product: {}\n\
         Rating: {}/5 stars\n\
         Review Count: {} reviews\n\
         Price: {}\n\
         Features: {}\n\
         Description: {}\n\n\
         Create a summary that highlights the key customer sentiment and product quality. \
         Make it exactly 18-20 words.",
        item.title, item.rating, item.review_count, item.price, item.features, item.description
    )
}

fn build_comparison_prompt(items: &[ProductMetadata]) -> String {
    let mut products_info = String::new();
    for (i, p) in items.iter().enumerate() {
        let _ = write!(
            products_info,
            "\nProduct {}: {}\n\
             - Price: {}\n\
             - Rating: {}/5 ({} reviews)\n\
             - Brand: {}\n\
             - Category: {}\n\
             - Key Features: {}\n",
            i + 1,
            p.title,
            p.price,
            p.rating,
            p.review_count,
            p.brand,
            p.category,
            p.features,
        );
    }

    format!(
        r#"Compare these products and provide insights:
{products_info}

Provide a single JSON object with:
{{
  "bestOverall": "Product index (0-based) that offers best overall value",
  "bestPrice": "Product index with best price point",
  "bestRated": "Product index with highest rating",
  "comparison": "2-3 sentence comparison highlighting key differences",
  "recommendation": "Which product to choose and why"
}}"#
    )
}

// ── Parsing and fallbacks ─────────────────────────────────────────────────────

/// Parse the model's search answer; `None` when extraction or parsing fails or
/// the required fields are missing.
fn parse_answer(text: &str) -> Option<ModelAnswer> {
    let answer: ModelAnswer = parse::parse_json_object(text)?;
    if answer.explanation.trim().is_empty() || answer.summary.trim().is_empty() {
        return None;
    }
    Some(answer)
}

/// Deterministic answer for unparsable model output, built purely from the
/// retrieved items' own fields. Detailed reasons for the top three, the
/// attachment step fills the rest with placeholders.
fn fallback_answer(hits: &[SearchHit]) -> ModelAnswer {
    ModelAnswer {
        explanation: "I found several products that match your search criteria based on their features and categories.".into(),
        recommendations: hits
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, hit)| ModelRecommendation {
                product_index: Value::from(i),
                reason: format!(
                    "This product has a rating of {}/5 with {} reviews and offers good value.",
                    hit.product.rating, hit.product.review_count
                ),
                key_benefits: format!(
                    "Quality {} from {} at competitive price.",
                    hit.product.category, hit.product.brand
                ),
            })
            .collect(),
        summary: format!(
            "Top rated products with {}/5 stars offering excellent features and competitive pricing.",
            hits[0].product.rating
        ),
    }
}

/// Deterministic answer when the model call itself failed.
fn model_failure_answer(hits: &[SearchHit]) -> ModelAnswer {
    ModelAnswer {
        explanation: "I found several products that match your search. Here are the most relevant options based on your query.".into(),
        recommendations: hits
            .iter()
            .enumerate()
            .map(|(i, hit)| ModelRecommendation {
                product_index: Value::from(i),
                reason: "Selected based on similarity to your search query".into(),
                key_benefits: format!(
                    "{}/5 stars with {} reviews",
                    hit.product.rating, hit.product.review_count
                ),
            })
            .collect(),
        summary: "Quality products matching your search with competitive pricing and good ratings.".into(),
    }
}

/// Pair every hit with its recommendation; positions the model skipped get a
/// generic placeholder so no result renders without a reason.
fn attach_recommendations(hits: &[SearchHit], answer: &ModelAnswer) -> Vec<RecommendedHit> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let recommendation = answer
                .recommendations
                .iter()
                .find(|r| value_to_index_opt(&r.product_index) == Some(i))
                .map(|r| Recommendation {
                    reason: r.reason.clone(),
                    key_benefits: r.key_benefits.clone(),
                })
                .unwrap_or_else(Recommendation::placeholder);

            RecommendedHit {
                hit: hit.clone(),
                recommendation,
            }
        })
        .collect()
}

/// Truncate to 20 words with a closing period, or pad with a fixed filler
/// clause when under 18.
fn enforce_word_bounds(summary: &str) -> String {
    let words: Vec<&str> = summary.split_whitespace().collect();
    if words.len() > SUMMARY_MAX_WORDS {
        let mut out = words[..SUMMARY_MAX_WORDS].join(" ");
        out.push('.');
        out
    } else if words.len() < SUMMARY_MIN_WORDS {
        format!("{summary} Excellent choice for customers seeking quality and value.")
    } else {
        summary.to_string()
    }
}

/// Coerce a model-written index (number or numeric string) to usize.
fn value_to_index_opt(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_index(value: Option<&Value>) -> usize {
    value.and_then(value_to_index_opt).unwrap_or(0)
}

fn string_field(obj: &Value, key: &str, fallback: fn() -> &'static str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback().into())
}

fn fallback_comparison_text() -> &'static str {
    "All products offer good value with different strengths in pricing, features, and customer satisfaction."
}

fn fallback_recommendation_text() -> &'static str {
    "Choose based on your specific needs and budget preferences."
}
