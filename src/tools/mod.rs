//! Tool system for the research loop
//!
//! Tools give the supervisor access to the web, arXiv and the internal
//! document index. The registry is built once at startup and resolves tool
//! calls by name.

mod academic_search;
mod context;
mod document_search;
mod registry;
mod web_search;

pub use academic_search::AcademicSearchTool;
pub use context::{ToolContext, ToolError, parse_input};
pub use document_search::{DocumentSearchTool, NO_RELEVANT_INFORMATION};
pub use registry::{NO_RESULTS, ToolRegistry};
pub use web_search::WebSearchTool;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolDefinition;

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the name the model calls)
    fn name(&self) -> &'static str;

    /// Human-readable description the model uses for tool selection
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput, eyre::Error>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// Output from tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_output_success() {
        let output = ToolOutput::success("3 results");
        assert_eq!(output.content, "3 results");
        assert!(!output.is_error);
    }

    #[test]
    fn test_tool_output_error() {
        let output = ToolOutput::error("quota exceeded");
        assert!(output.is_error);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is a ...");
        // multi-byte characters are never split
        assert_eq!(truncate("héllo wörld", 7), "héllo w...");
    }
}
