//! Pinecone query client
//!
//! The index host is looked up once through the control plane; every query
//! after that goes straight to the data plane.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use super::{RetrievalError, ScoredChunk, VectorIndex};

const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io/indexes";

const PINECONE_API_VERSION: &str = "2024-07";

/// Metadata key holding the chunk text
const TEXT_KEY: &str = "text";

/// Metadata key holding the source filename
const SOURCE_KEY: &str = "source";

/// Read-only handle to a Pinecone index
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    index_name: String,
    host: OnceCell<String>,
}

impl PineconeIndex {
    pub fn new(api_key: String, index_name: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            index_name: index_name.into(),
            host: OnceCell::new(),
        })
    }

    async fn host(&self) -> Result<&str, RetrievalError> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/{}", PINECONE_CONTROL_URL, self.index_name);
                let body = self.send(self.client.get(url)).await?;
                let host = body["host"]
                    .as_str()
                    .ok_or_else(|| RetrievalError::InvalidResponse("index description has no host".to_string()))?;
                debug!("Resolved Pinecone index {} to host {}", self.index_name, host);
                Ok::<_, RetrievalError>(host.to_string())
            })
            .await?;
        Ok(host.as_str())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, RetrievalError> {
        let response = request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
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

        Ok(response.json().await?)
    }
}

fn build_query(vector: &[f32], top_k: usize, sources: Option<&[String]>) -> Value {
    let mut body = json!({
        "vector": vector,
        "topK": top_k,
        "includeMetadata": true,
        "includeValues": false
    });

    if let Some(sources) = sources {
        body["filter"] = json!({ SOURCE_KEY: { "$in": sources } });
    }

    body
}

fn parse_matches(body: &Value) -> Vec<ScoredChunk> {
    body["matches"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| {
            let text = m["metadata"][TEXT_KEY].as_str()?;
            Some(ScoredChunk {
                source: m["metadata"][SOURCE_KEY].as_str().unwrap_or("Unknown").to_string(),
                text: text.to_string(),
                score: m["score"].as_f64().unwrap_or(0.0) as f32,
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let host = self.host().await?;
        let url = format!("https://{}/query", host);
        let body = build_query(vector, top_k, sources);
        let response = self.send(self.client.post(url).json(&body)).await?;
        Ok(parse_matches(&response))
    }
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex").field("index_name", &self.index_name).finish()
    }
}
