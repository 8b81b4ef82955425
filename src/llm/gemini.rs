//! Google Gemini client implementation
//!
//! Speaks the `generateContent` REST endpoint with function declarations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::client::{LlmClient, LlmError};
use super::types::{CompletionRequest, CompletionResponse, StopReason, Usage};
use crate::conversation::{ContentBlock, Message, MessageContent, ToolCall};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Prefix of call ids minted locally when a `functionCall` carries none
const LOCAL_CALL_PREFIX: &str = "local-call-";

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.0),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, api_key, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.config.model)
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let mut generation = json!({
            "maxOutputTokens": request.max_tokens.unwrap_or(self.config.max_tokens)
        });
        if let Some(temperature) = request.temperature.or(self.config.temperature) {
            generation["temperature"] = json!(temperature);
        }

        let mut body = json!({
            "contents": to_gemini_contents(&request.messages),
            "generationConfig": generation
        });

        if !request.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": request.system }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request.tools.iter().map(|t| t.to_gemini_declaration()).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    fn parse_response(&self, body: Value) -> Result<CompletionResponse, LlmError> {
        let Some(candidate) = body["candidates"].get(0) else {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(LlmError::InvalidResponse(reason.to_string()));
        };

        let usage = Usage::new(
            body["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0),
            body["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0),
        );

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate["content"]["parts"].as_array().into_iter().flatten() {
            if let Some(chunk) = part["text"].as_str() {
                text.push_str(chunk);
            } else if let Some(call) = part.get("functionCall") {
                // Gemini only sometimes echoes an id; correlation needs one
                let id = call["id"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}{}", LOCAL_CALL_PREFIX, uuid::Uuid::new_v4().simple()));
                let name = call["name"].as_str().unwrap_or_default();
                let args = match &call["args"] {
                    Value::Null => json!({}),
                    args => args.clone(),
                };
                tool_calls.push(ToolCall::new(id, name, args));
            }
        }

        let stop_reason = match candidate["finishReason"].as_str() {
            _ if !tool_calls.is_empty() => StopReason::ToolUse,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Ok(CompletionResponse {
            content: MessageContent::Text(text),
            tool_calls,
            stop_reason,
            usage,
        })
    }

    async fn send_request(&self, body: Value) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(60),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Convert the conversation into Gemini `contents`, merging adjacent turns
/// that share a role.
fn to_gemini_contents(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();

    for message in messages {
        let (role, parts) = match message {
            Message::Human { content } => ("user", content_parts(content)),
            Message::Assistant { content, tool_calls } => {
                let mut parts = content_parts(content);
                parts.extend(tool_calls.iter().map(|call| {
                    let mut function_call = json!({ "name": call.name, "args": call.input });
                    if let Some(id) = model_call_id(&call.id) {
                        function_call["id"] = json!(id);
                    }
                    json!({ "functionCall": function_call })
                }));
                ("model", parts)
            }
            Message::ToolResult {
                call_id,
                name,
                content,
                is_error,
            } => {
                let key = if *is_error { "error" } else { "content" };
                let mut function_response = json!({ "name": name, "response": { key: content } });
                if let Some(id) = model_call_id(call_id) {
                    function_response["id"] = json!(id);
                }
                ("user", vec![json!({ "functionResponse": function_response })])
            }
        };

        if parts.is_empty() {
            continue;
        }

        match contents.last_mut() {
            Some(last) if last["role"] == role => {
                if let Some(existing) = last["parts"].as_array_mut() {
                    existing.extend(parts);
                }
            }
            _ => contents.push(json!({ "role": role, "parts": parts })),
        }
    }

    contents
}

/// The call id as Gemini issued it, or `None` if it was minted locally
fn model_call_id(id: &str) -> Option<&str> {
    (!id.starts_with(LOCAL_CALL_PREFIX)).then_some(id)
}

fn content_parts(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) if text.is_empty() => Vec::new(),
        MessageContent::Text(text) => vec![json!({ "text": text })],
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.is_empty() => Some(json!({ "text": text })),
                ContentBlock::Image { media_type, data } => {
                    Some(json!({ "inlineData": { "mimeType": media_type, "data": data } }))
                }
                _ => None,
            })
            .collect(),
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(&request);
        let response = self.send_request(body).await?;
        self.parse_response(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").field("model", &self.config.model).finish()
    }
}
