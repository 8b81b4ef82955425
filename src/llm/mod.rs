//! Model gateway layer - Anthropic and Gemini integrations with tool calling
//!
//! This module provides:
//! - Request/response types for model communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient and GeminiClient implementations
//! - MockLlmClient for scripted tests

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient};
pub use gemini::{GeminiClient, GeminiConfig};
pub use types::{CompletionRequest, CompletionResponse, StopReason, ToolDefinition, Usage};
