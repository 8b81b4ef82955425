//! Message types carried in the conversation log

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => write!(f, "Human"),
            Role::Assistant => write!(f, "Assistant"),
            Role::Tool => write!(f, "Tool"),
        }
    }
}

/// Message body: plain text, or a sequence of typed blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Concatenated text of all text blocks; non-text blocks are skipped
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// A typed block inside structured content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        media_type: String,
        data: String,
    },
    /// Any block type this crate does not model
    #[serde(other)]
    Unsupported,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    Human {
        content: MessageContent,
    },
    Assistant {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Message {
    /// Create a human message
    pub fn human(content: impl Into<MessageContent>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<MessageContent>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result correlated to `call_id`
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Message::ToolResult {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::Human { .. } => Role::Human,
            Message::Assistant { .. } => Role::Assistant,
            Message::ToolResult { .. } => Role::Tool,
        }
    }

    /// Text payload of the message
    pub fn text(&self) -> String {
        match self {
            Message::Human { content } | Message::Assistant { content, .. } => content.text(),
            Message::ToolResult { content, .. } => content.clone(),
        }
    }

    /// Tool calls carried by an assistant message (empty for other roles)
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_skips_non_text_blocks() {
        let content = MessageContent::Blocks(vec![
            ContentBlock::Text {
                text: "Google reported ".to_string(),
            },
            ContentBlock::Image {
                media_type: "image/png".to_string(),
                data: "iVBORw0".to_string(),
            },
            ContentBlock::Unsupported,
            ContentBlock::Text {
                text: "record revenue.".to_string(),
            },
        ]);
        assert_eq!(content.text(), "Google reported record revenue.");
    }

    #[test]
    fn test_unknown_block_type_deserializes_as_unsupported() {
        let content: MessageContent = serde_json::from_value(json!([
            {"type": "text", "text": "hi"},
            {"type": "thinking", "thinking": "hmm"}
        ]))
        .unwrap();

        match content {
            MessageContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(blocks[1], ContentBlock::Unsupported);
            }
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_string_content_deserializes_as_text() {
        let content: MessageContent = serde_json::from_value(json!("plain")).unwrap();
        assert_eq!(content, MessageContent::Text("plain".to_string()));
    }

    #[test]
    fn test_blank_content() {
        assert!(MessageContent::from("  \n").is_blank());
        assert!(MessageContent::Blocks(vec![ContentBlock::Unsupported]).is_blank());
        assert!(!MessageContent::from("answer").is_blank());
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::human("q").role(), Role::Human);
        assert_eq!(Message::assistant("a", vec![]).role(), Role::Assistant);
        assert_eq!(Message::tool_result("c1", "web_search", "r", false).role(), Role::Tool);
        assert_eq!(Role::Tool.to_string(), "Tool");
    }

    #[test]
    fn test_tool_calls_only_on_assistant() {
        let call = ToolCall::new("c1", "web_search", json!({"query": "rust"}));
        let msg = Message::assistant("", vec![call.clone()]);
        assert_eq!(msg.tool_calls(), &[call]);
        assert!(Message::human("q").tool_calls().is_empty());
    }

    #[test]
    fn test_message_serialization_is_role_tagged() {
        let msg = Message::tool_result("c1", "document_search", "Source: a.pdf", false);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool_result");
        assert_eq!(value["call_id"], "c1");

        let assistant = serde_json::to_value(Message::assistant("done", vec![])).unwrap();
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("tool_calls").is_none());
    }
}
