//! Read-only retrieval over the pre-built document index
//!
//! The index is populated offline; this crate only embeds queries and runs
//! similarity lookups against it.

mod embedder;
mod memory;
mod pinecone;

pub use embedder::{DEFAULT_EMBEDDING_MODEL, GeminiEmbedder};
pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A document chunk returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Source filename recorded at ingestion time
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Turns text into an embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Similarity index keyed by document chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top `top_k` chunks nearest to `vector`, restricted to chunks whose
    /// source is in `sources` when given
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>, RetrievalError>;
}

/// Errors from the embedding service or the vector index
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_display() {
        let err = RetrievalError::DimensionMismatch {
            expected: 768,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: index expects 768, got 3");
    }
}
