//! Hugging Face feature-extraction backend (primary embedding provider).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::EmbeddingBackend;
use crate::config::EmbeddingConfig;
use crate::error::{CartError, Result};

/// Remote embedding backend over the HF inference API.
pub struct HuggingFaceBackend {
    client: Client,
    endpoint: String,
    model: String,
    token: String,
}

/// The feature-extraction endpoint returns either a bare vector or a
/// one-element batch wrapping one, depending on model and input shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtraction {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl HuggingFaceBackend {
    pub fn new(config: &EmbeddingConfig, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.hf_endpoint.clone(),
            model: config.model.clone(),
            token,
        })
    }

    /// Normalize both response shapes into a single vector.
    fn flatten(response: FeatureExtraction) -> Result<Vec<f32>> {
        let vector = match response {
            FeatureExtraction::Single(v) => v,
            FeatureExtraction::Batch(mut b) => {
                if b.is_empty() {
                    return Err(CartError::MalformedResponse(
                        "feature-extraction returned an empty batch".into(),
                    ));
                }
                b.swap_remove(0)
            }
        };
        if vector.is_empty() {
            return Err(CartError::MalformedResponse(
                "feature-extraction returned an empty vector".into(),
            ));
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingBackend for HuggingFaceBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/pipeline/feature-extraction/{}", self.endpoint, self.model);
        let body = serde_json::json!({
            "inputs": text,
            "options": { "wait_for_model": true },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CartError::EmbeddingUnavailable(format!(
                "HF feature extraction failed: {status}: {body}"
            )));
        }

        let parsed: FeatureExtraction = response.json().await.map_err(|e| {
            CartError::MalformedResponse(format!("unexpected embedding response format: {e}"))
        })?;

        Self::flatten(parsed)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
