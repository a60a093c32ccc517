//! Google `embedContent` backend (secondary embedding provider).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::EmbeddingBackend;
use crate::config::EmbeddingConfig;
use crate::error::{CartError, Result};

pub struct GoogleBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GoogleBackend {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.google_endpoint.clone(),
            model: config.google_model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for GoogleBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.endpoint, self.model
        );
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CartError::EmbeddingUnavailable(format!(
                "Google embedContent failed: {status}: {body}"
            )));
        }

        let parsed: EmbedContentResponse = response.json().await.map_err(|e| {
            CartError::MalformedResponse(format!("missing embedding values: {e}"))
        })?;

        if parsed.embedding.values.is_empty() {
            return Err(CartError::MalformedResponse(
                "embedContent returned an empty vector".into(),
            ));
        }

        Ok(parsed.embedding.values)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
