//! Tool registry and executor
//!
//! The registry is the name-keyed dispatch table for tool calls. Executing a
//! batch never fails: every outcome, including unknown names, bad arguments,
//! handler errors and panics, becomes a tool-result message.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use log::{debug, warn};

use super::{Tool, ToolContext, ToolError};
use crate::conversation::{Message, ToolCall};
use crate::llm::ToolDefinition;

/// Payload used when a tool ran but produced nothing
pub const NO_RESULTS: &str = "no results found";

/// Fixed set of tools available to the supervisor
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Add a tool; a later registration under the same name replaces the earlier one
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get tool definitions for the model, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Get the list of tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute one tool call and wrap the outcome as a tool-result message
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Message {
        let Some(tool) = self.tools.get(&call.name) else {
            let err = ToolError::UnknownTool {
                name: call.name.clone(),
            };
            warn!("Tool call {} rejected: {}", call.id, err);
            return Message::tool_result(&call.id, &call.name, format!("error: {}", err), true);
        };

        if !call.input.is_object() {
            let err = ToolError::InvalidInput {
                message: format!("expected a JSON object, got {}", call.input),
            };
            warn!("Tool call {} rejected: {}", call.id, err);
            return Message::tool_result(&call.id, &call.name, format!("error: {}", err), true);
        }

        debug!("Executing tool {} (call {})", call.name, call.id);

        let outcome = AssertUnwindSafe(tool.execute(call.input.clone(), ctx))
            .catch_unwind()
            .await;

        let (content, is_error) = match outcome {
            Ok(Ok(output)) if output.content.trim().is_empty() => (NO_RESULTS.to_string(), false),
            Ok(Ok(output)) => (output.content, output.is_error),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {:#}", call.name, e);
                (format!("error: {:#}", e), true)
            }
            Err(_) => {
                warn!("Tool {} panicked", call.name);
                (format!("error: tool '{}' panicked", call.name), true)
            }
        };

        Message::tool_result(&call.id, &call.name, content, is_error)
    }

    /// Execute calls one after another, returning results in call order
    pub async fn execute_all(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<Message> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            results.push(self.execute(call, ctx).await);
        }

        results
    }
}
