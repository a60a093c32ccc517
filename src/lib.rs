//! Semantic product search backend — retrieval-augmented generation over a
//! remote vector index.
//!
//! A free-text shopping query flows through the crate as:
//!
//! ```text
//! query → embedding (HF, Google fallback) → vector index KNN → score filter
//!       → generative synthesis (Gemini, deterministic fallback) → caller
//! ```
//!
//! # Architecture
//!
//! - **Embeddings**: ordered fallback chain of hosted providers — Hugging Face
//!   feature extraction first, Google `text-embedding-004` second
//! - **Index**: Pinecone-style REST ANN index behind the [`index::IndexBackend`]
//!   trait; the data-plane connection is established lazily and reused
//! - **Synthesis**: a single generative-model call per request, parsed
//!   defensively — malformed model output degrades into a deterministic
//!   template, never into a caller-visible error
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`embedding`] — Text preprocessing and the multi-provider embedding service
//! - [`index`] — Vector index access: upsert, query, fetch, stats, canonicalization
//! - [`search`] — Search orchestration: semantic search, recommendations, comparison
//! - [`synthesis`] — Response synthesis: prompts, JSON extraction, fallbacks
//! - [`seed`] — Bulk-load pipeline from raw product records
//! - [`server`] — HTTP boundary (axum)
//! - [`error`] — Typed error taxonomy

pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod search;
pub mod seed;
pub mod server;
pub mod synthesis;
