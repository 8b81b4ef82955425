//! In-process vector index (cosine similarity)

use async_trait::async_trait;

use super::{RetrievalError, ScoredChunk, VectorIndex};

#[derive(Debug, Clone)]
struct Entry {
    vector: Vec<f32>,
    source: String,
    text: String,
}

/// Brute-force index held in memory
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: Vec<Entry>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk with a precomputed embedding
    pub fn insert(&mut self, vector: Vec<f32>, source: impl Into<String>, text: impl Into<String>) {
        self.entries.push(Entry {
            vector,
            source: source.into(),
            text: text.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let mut scored = Vec::new();
        for entry in &self.entries {
            if entry.vector.len() != vector.len() {
                return Err(RetrievalError::DimensionMismatch {
                    expected: entry.vector.len(),
                    actual: vector.len(),
                });
            }
            if sources.is_some_and(|s| !s.contains(&entry.source)) {
                continue;
            }
            scored.push(ScoredChunk {
                source: entry.source.clone(),
                text: entry.text.clone(),
                score: cosine(&entry.vector, vector),
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
