//! Tool execution context - scoped to a single research session

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Execution context handed to every tool call
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Documents in scope for retrieval when a call names none
    pub selected_documents: Vec<String>,
}

impl ToolContext {
    pub fn new(selected_documents: Vec<String>) -> Self {
        Self { selected_documents }
    }

    /// Document scope, or None when every document is in scope
    pub fn document_scope(&self) -> Option<&[String]> {
        if self.selected_documents.is_empty() {
            None
        } else {
            Some(&self.selected_documents)
        }
    }
}

/// Errors raised by tools before they reach an external service
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {message}")]
    InvalidInput { message: String },

    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },
}

/// Deserialize tool arguments into a typed struct
pub fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    if !input.is_object() {
        return Err(ToolError::InvalidInput {
            message: format!("expected a JSON object, got {}", input),
        });
    }
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput { message: e.to_string() })
}
