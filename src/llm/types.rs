//! Request and response types for the model gateway

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::{Message, MessageContent, ToolCall};

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Convert to Anthropic API schema format
    pub fn to_anthropic_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema
        })
    }

    /// Convert to a Gemini function declaration
    pub fn to_gemini_declaration(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema
        })
    }
}

/// Request to the model for one completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Transient system directive; never stored in the conversation
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a new completion request with a system prompt
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }

    /// Add a message to the request
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Replace the message list
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Add tools to the request
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from the model
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: MessageContent,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// Plain text answer with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: MessageContent::Text(content.into()),
            ..Default::default()
        }
    }

    /// Response requesting the given tool calls
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: MessageContent::Text(content.into()),
            tool_calls,
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    /// Convert into the assistant message appended to the conversation
    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.tool_calls)
    }
}

/// Reason why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Create new usage stats
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Calculate total tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    #[test]
    fn test_tool_definition_to_anthropic_schema() {
        let tool = ToolDefinition::new("web_search", "Search the web", schema());
        let value = tool.to_anthropic_schema();
        assert_eq!(value["name"], "web_search");
        assert_eq!(value["description"], "Search the web");
        assert!(value["input_schema"].is_object());
    }

    #[test]
    fn test_tool_definition_to_gemini_declaration() {
        let tool = ToolDefinition::new("web_search", "Search the web", schema());
        let value = tool.to_gemini_declaration();
        assert_eq!(value["name"], "web_search");
        assert_eq!(value["parameters"]["required"][0], "query");
    }

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("You are a research supervisor")
            .with_message(Message::human("Hello"))
            .with_max_tokens(1000)
            .with_temperature(0.0);

        assert_eq!(req.system, "You are a research supervisor");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.max_tokens, Some(1000));
        assert_eq!(req.temperature, Some(0.0));
        assert!(req.tools.is_empty());
    }

    #[test]
    fn test_response_into_message() {
        let call = ToolCall::new("c1", "web_search", json!({"query": "rust"}));
        let msg = CompletionResponse::with_tool_calls("searching", vec![call]).into_message();
        assert_eq!(msg.tool_calls().len(), 1);
        assert_eq!(msg.text(), "searching");

        let msg = CompletionResponse::text("done").into_message();
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_usage_total() {
        assert_eq!(Usage::new(300, 150).total(), 450);
    }
}
