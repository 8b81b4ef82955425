//! Gemini embedding client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{Embedder, RetrievalError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Must match the model the index was built with
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";

/// Embeds queries with the Gemini `embedContent` endpoint
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:embedContent", GEMINI_API_BASE, self.model)
    }

    fn build_request(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_QUERY"
        })
    }
}

fn parse_embedding(body: &Value) -> Result<Vec<f32>, RetrievalError> {
    let values = body["embedding"]["values"]
        .as_array()
        .ok_or_else(|| RetrievalError::InvalidResponse("missing embedding.values".to_string()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| RetrievalError::InvalidResponse(format!("non-numeric embedding value: {}", v)))
        })
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RetrievalError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        parse_embedding(&body)
    }
}
