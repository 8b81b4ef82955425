//! document_search tool - similarity search over the internal document index

use std::sync::Arc;

use async_trait::async_trait;
use eyre::WrapErr;
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolError, ToolOutput, parse_input};
use crate::retrieval::{Embedder, ScoredChunk, VectorIndex};

/// Returned verbatim when the index has nothing for the query
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the internal documents.";

/// Search the internal document index
pub struct DocumentSearchTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct DocumentSearchArgs {
    query: String,
    #[serde(default)]
    filenames: Option<Vec<String>>,
}

impl DocumentSearchTool {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self { embedder, index, top_k }
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &'static str {
        "document_search"
    }

    fn description(&self) -> &'static str {
        "Search the internal documents (uploaded PDFs) for relevant passages. \
         Optionally restrict the search to specific filenames."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the documents"
                },
                "filenames": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only search these documents (e.g. [\"Google.pdf\"])"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput, eyre::Error> {
        let args: DocumentSearchArgs = parse_input(input)?;
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidInput {
                message: "query must not be empty".to_string(),
            }
            .into());
        }

        let scope = match args.filenames.as_deref() {
            Some(names) if !names.is_empty() => Some(names),
            _ => ctx.document_scope(),
        };
        debug!("document_search: query={:?} scope={:?}", args.query, scope);

        let vector = self.embedder.embed(&args.query).await.wrap_err("failed to embed query")?;
        let chunks = self
            .index
            .query(&vector, self.top_k, scope)
            .await
            .wrap_err("document index query failed")?;

        Ok(ToolOutput::success(format_chunks(&chunks)))
    }
}

fn format_chunks(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return NO_RELEVANT_INFORMATION.to_string();
    }

    chunks
        .iter()
        .map(|c| format!("Source: {}\nContent: {}", c.source, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
