//! Product metadata canonicalization.
//!
//! Source records arrive with varying field-name conventions (Kaggle exports,
//! scraped catalogs, hand-written JSON). [`canonicalize`] coalesces the known
//! aliases into one fixed schema, coerces currency strings into numbers, and
//! truncates long text to respect the index service's metadata size limits.
//! The canonical field names are the de facto wire contract consumed by the
//! cart layer and the frontend — do not rename them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum stored description length.
const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum stored feature-text length.
const MAX_FEATURES_LEN: usize = 300;

/// Canonical product metadata stored alongside each vector.
///
/// `price`, `rating`, and `reviewCount` are always numbers — never raw
/// currency strings — by the time a record reaches the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProductMetadata {
    pub title: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    #[serde(rename = "originalPrice")]
    pub original_price: f64,
    pub discount: f64,
    pub rating: f64,
    #[serde(rename = "reviewCount")]
    pub review_count: u64,
    pub description: String,
    pub image: String,
    pub url: String,
    pub features: String,
}

/// A raw product record as produced by the ingestion tool.
///
/// Every field is optional and numeric-ish fields are kept as loose JSON
/// values, because source data mixes `"₹399"`, `"399"`, and `399` freely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    #[serde(alias = "id", alias = "uniq_id", alias = "pid")]
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "product_category_tree")]
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Value>,
    pub discounted_price: Option<Value>,
    #[serde(alias = "retail_price")]
    pub actual_price: Option<Value>,
    #[serde(rename = "originalPrice")]
    pub original_price: Option<Value>,
    pub discount: Option<Value>,
    pub discount_percentage: Option<Value>,
    pub rating: Option<Value>,
    #[serde(rename = "reviewCount")]
    pub review_count: Option<Value>,
    pub rating_count: Option<Value>,
    pub description: Option<String>,
    pub about_product: Option<String>,
    pub review_content: Option<String>,
    pub image: Option<String>,
    pub img_link: Option<String>,
    pub url: Option<String>,
    pub product_link: Option<String>,
    pub features: Option<String>,
    pub review_title: Option<String>,
    pub product_specifications: Option<String>,
}

impl RawProduct {
    /// Resolve the record id, falling back to a positional synthetic id.
    pub fn resolved_id(&self, position: usize) -> String {
        self.product_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("product_{position}"))
    }

    // Text accessors used to build the embedding input. Field order and
    // coalescing mirror what the seeding path has always embedded.

    pub fn name_text(&self) -> String {
        coalesce_str(&[&self.product_name, &self.title])
    }

    pub fn category_text(&self) -> String {
        self.category.clone().unwrap_or_default()
    }

    pub fn description_text(&self) -> String {
        coalesce_str(&[&self.description, &self.about_product])
    }

    pub fn brand_text(&self) -> String {
        self.brand.clone().unwrap_or_default()
    }

    pub fn specifications_text(&self) -> String {
        self.product_specifications.clone().unwrap_or_default()
    }
}

/// A raw product paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedProduct {
    pub raw: RawProduct,
    pub embedding: Vec<f32>,
}

/// Build canonical metadata from a raw record.
pub fn canonicalize(raw: &RawProduct) -> ProductMetadata {
    ProductMetadata {
        title: coalesce_str(&[&raw.title, &raw.product_name]),
        category: raw.category.clone().unwrap_or_default(),
        brand: raw.brand.clone().unwrap_or_default(),
        price: clean_price(coalesce_value(&[
            &raw.price,
            &raw.discounted_price,
            &raw.actual_price,
        ])),
        original_price: clean_price(coalesce_value(&[
            &raw.original_price,
            &raw.actual_price,
            &raw.discounted_price,
        ])),
        discount: clean_number(coalesce_value(&[&raw.discount, &raw.discount_percentage])),
        rating: clean_number(raw.rating.as_ref()),
        review_count: clean_number(coalesce_value(&[&raw.review_count, &raw.rating_count]))
            .max(0.0) as u64,
        description: truncate_chars(
            &coalesce_str(&[&raw.description, &raw.about_product, &raw.review_content]),
            MAX_DESCRIPTION_LEN,
        ),
        image: coalesce_str(&[&raw.image, &raw.img_link]),
        url: coalesce_str(&[&raw.url, &raw.product_link]).trim().to_string(),
        features: truncate_chars(
            &coalesce_str(&[&raw.features, &raw.review_title]),
            MAX_FEATURES_LEN,
        ),
    }
}

/// First non-empty string among the candidates, else empty.
fn coalesce_str(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

/// First present value among the candidates.
fn coalesce_value<'a>(candidates: &[&'a Option<Value>]) -> Option<&'a Value> {
    candidates.iter().find_map(|c| c.as_ref())
}

/// Strip non-numeric characters from a price-like value and parse defensively.
/// `"₹1,299.00"` → `1299.0`; anything unparsable → `0.0`.
fn clean_price(value: Option<&Value>) -> f64 {
    let Some(value) = value else { return 0.0 };
    if let Some(n) = value.as_f64() {
        return n;
    }
    let raw = value.as_str().unwrap_or_default();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse().unwrap_or(0.0)
}

/// Coerce a loose JSON value into a number; invalid or missing → 0.
fn clean_number(value: Option<&Value>) -> f64 {
    let Some(value) = value else { return 0.0 };
    if let Some(n) = value.as_f64() {
        return n;
    }
    value
        .as_str()
        .and_then(|s| s.trim().replace(',', "").parse().ok())
        .unwrap_or(0.0)
}

/// Truncate on a character boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
