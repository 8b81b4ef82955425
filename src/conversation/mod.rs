//! Conversation log, message model and routing
//!
//! This module provides:
//! - Message and content block types
//! - ConversationState, the append-only log driven through phase transitions
//! - route(), the pure decision function over the last message

pub mod message;
pub mod state;

pub use message::{ContentBlock, Message, MessageContent, Role, ToolCall};
pub use state::{ConversationState, Phase, Route, route};
