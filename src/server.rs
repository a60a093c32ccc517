//! HTTP boundary (axum).
//!
//! Thin handlers over the injected services. Wherever a partial or empty
//! answer is a valid business outcome (no hits above the score floor) the
//! endpoint answers 200 with a human-readable message; only bad input and true
//! infrastructure failures map to error statuses.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::{CartConfig, SearchConfig};
use crate::error::CartError;
use crate::index::VectorIndex;
use crate::search::SearchEngine;
use crate::synthesis::ResponseSynthesizer;

#[derive(Clone)]
pub struct AppState {
    pub search: SearchEngine,
    pub synthesizer: ResponseSynthesizer,
    pub index: VectorIndex,
    pub defaults: SearchConfig,
}

/// Map domain errors to HTTP statuses.
struct ApiError(CartError);

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CartError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CartError::ItemNotFound(_) | CartError::InsufficientItems { .. } => {
                StatusCode::NOT_FOUND
            }
            CartError::EmbeddingUnavailable(_)
            | CartError::MalformedResponse(_)
            | CartError::Index(_)
            | CartError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(err = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    limit: Option<usize>,
    #[serde(rename = "minScore")]
    min_score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    #[serde(rename = "productIds", default)]
    product_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TrendingQuery {
    limit: Option<usize>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    limit: Option<usize>,
    #[serde(rename = "minRating")]
    min_rating: Option<f64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/products/search", post(search_products))
        .route("/api/products/compare", post(compare_products))
        .route("/api/products/trending/all", get(trending_products))
        .route("/api/products/category/{category}", get(products_by_category))
        .route("/api/products/{id}", get(product_by_id))
        .route("/api/products/{id}/recommendations", get(recommendations))
        .route("/api/index/stats", get(index_stats))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &CartConfig, state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "VectorCart API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            info!("shutting down");
        })
        .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK", "message": "VectorCart API is running" }))
}

/// Main RAG endpoint: semantic search plus synthesized explanation.
async fn search_products(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = req.limit.unwrap_or(state.defaults.default_limit);
    let min_score = req.min_score.unwrap_or(state.defaults.default_min_score);

    let hits = state.search.semantic_search(&req.query, limit, min_score).await?;

    if hits.is_empty() {
        return Ok(Json(json!({
            "query": req.query,
            "products": [],
            "message": "No products found matching your query. Try different keywords.",
            "totalResults": 0,
        })));
    }

    let response = state.synthesizer.explain_results(&req.query, &hits).await;

    let mut body = serde_json::to_value(&response).expect("response serializes");
    body["timestamp"] = json!(chrono::Utc::now().to_rfc3339());
    Ok(Json(body))
}

async fn product_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let hit = state.search.get_product(&id).await?;
    let review_summary = state.synthesizer.summarize_item(&hit.product).await;

    let mut product = serde_json::to_value(&hit.product).expect("metadata serializes");
    product["reviewSummary"] = json!(review_summary);

    Ok(Json(json!({
        "product": product,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(state.defaults.recommend_limit);
    let hits = state.search.recommend_similar(&id, limit).await?;

    if hits.is_empty() {
        return Ok(Json(json!({
            "productId": id,
            "recommendations": [],
            "message": "No recommendations found for this product.",
            "totalResults": 0,
        })));
    }

    let response = state
        .synthesizer
        .explain_results(&format!("Products similar to {id}"), &hits)
        .await;

    Ok(Json(json!({
        "productId": id,
        "recommendations": response.products,
        "explanation": response.explanation,
        "summary": response.summary,
        "totalResults": hits.len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn compare_products(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = state.search.compare_items(&req.product_ids).await?;
    let comparison = state.synthesizer.compare(&products).await;

    Ok(Json(json!({
        "products": products,
        "comparison": comparison,
        "totalProducts": products.len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn trending_products(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(20);
    let products = state.search.trending(limit, query.category.as_deref()).await?;

    if products.is_empty() {
        return Ok(Json(json!({
            "products": [],
            "message": "No trending products found.",
            "totalResults": 0,
        })));
    }

    Ok(Json(json!({
        "products": products,
        "category": query.category.as_deref().unwrap_or("all"),
        "totalResults": products.len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(20);
    let min_rating = query.min_rating.unwrap_or(0.0);
    let products = state.search.by_category(&category, limit, min_rating).await?;

    Ok(Json(json!({
        "category": category,
        "products": products,
        "totalResults": products.len(),
        "filters": { "minRating": min_rating },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn index_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.index.stats().await?;
    Ok(Json(serde_json::to_value(&stats).expect("stats serialize")))
}
