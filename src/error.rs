//! Typed error taxonomy for the search pipeline.
//!
//! Callers match on these to map failures to HTTP statuses; the variants
//! deliberately distinguish "you asked for something wrong" (`InvalidInput`,
//! `ItemNotFound`, `InsufficientItems`) from "a dependency let us down"
//! (`EmbeddingUnavailable`, `MalformedResponse`, `Index`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CartError>;

#[derive(Debug, Error)]
pub enum CartError {
    /// Caller-supplied input failed validation before any provider call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every provider in the embedding fallback chain failed. The message
    /// carries the primary provider's error.
    #[error("embedding providers unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A provider answered with a shape we could not interpret.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// No item in the index matches the requested id.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// A comparison resolved fewer than two of the requested items.
    #[error("only {resolved} of the requested items could be resolved; at least 2 are required")]
    InsufficientItems { resolved: usize },

    /// The vector index rejected or failed a request.
    #[error("index error: {0}")]
    Index(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
