//! Conversation state machine and router
//!
//! The log is append-only: every mutation goes through a transition method
//! that validates the current phase before pushing anything.

use serde::{Deserialize, Serialize};

use super::message::{Message, ToolCall};
use crate::error::{ResearchError, Result};

/// Phase of the agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the supervisor to produce the next assistant message
    AwaitingModel,
    /// The last assistant message requested tools that have not run yet
    AwaitingTools,
    /// The last assistant message carried no tool calls
    Terminated,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminated)
    }
}

/// Routing decision taken after each supervisor step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route<'a> {
    /// Run these calls, then return to the supervisor
    Tools(&'a [ToolCall]),
    /// Stop; the last assistant text is the answer
    End,
}

/// Decide the next step from the most recent message only.
///
/// An assistant message with tool calls routes to the executor; anything
/// else ends the loop.
pub fn route(last: Option<&Message>) -> Route<'_> {
    match last {
        Some(Message::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => Route::Tools(tool_calls),
        _ => Route::End,
    }
}

/// Append-only conversation log for one research session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    /// Documents currently in scope for retrieval filtering
    #[serde(default)]
    pub selected_documents: Vec<String>,
    phase: Phase,
}

impl ConversationState {
    /// Start a session from the user's query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(query.into())],
            selected_documents: Vec::new(),
            phase: Phase::AwaitingModel,
        }
    }

    /// Restrict document search to these files when the model gives no filter
    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.selected_documents = documents;
        self
    }

    /// Rebuild a state from a persisted log, running every message back
    /// through the transitions so a corrupt log is rejected.
    pub fn replay(messages: Vec<Message>, selected_documents: Vec<String>) -> Result<Self> {
        let mut iter = messages.into_iter();
        let mut state = match iter.next() {
            Some(first @ Message::Human { .. }) => Self {
                messages: vec![first],
                selected_documents,
                phase: Phase::AwaitingModel,
            },
            Some(other) => {
                return Err(ResearchError::InvalidTransition(format!(
                    "conversation must start with a human message, got {}",
                    other.role()
                )));
            }
            None => return Err(ResearchError::InvalidTransition("empty conversation log".to_string())),
        };

        let mut batch = Vec::new();
        for message in iter {
            match message {
                Message::Human { .. } => state.push_human(message)?,
                Message::Assistant { .. } => {
                    state.record_assistant(message)?;
                }
                Message::ToolResult { .. } => {
                    batch.push(message);
                    if state.phase != Phase::AwaitingTools || batch.len() >= state.pending_calls().len() {
                        state.record_tool_results(std::mem::take(&mut batch))?;
                    }
                }
            }
        }

        if !batch.is_empty() {
            return Err(ResearchError::InvalidTransition(format!(
                "log ends with {} of {} tool results",
                batch.len(),
                state.pending_calls().len()
            )));
        }

        Ok(state)
    }

    /// Continue a finished conversation with a follow-up query
    pub fn resume(&mut self, query: impl Into<String>) -> Result<()> {
        self.push_human(Message::human(query.into()))
    }

    fn push_human(&mut self, message: Message) -> Result<()> {
        if self.phase != Phase::Terminated {
            return Err(ResearchError::InvalidTransition(format!(
                "cannot resume a session in phase {:?}",
                self.phase
            )));
        }
        self.messages.push(message);
        self.phase = Phase::AwaitingModel;
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Route on the latest message
    pub fn route(&self) -> Route<'_> {
        route(self.last())
    }

    /// Calls waiting for results (empty unless awaiting tools)
    pub fn pending_calls(&self) -> &[ToolCall] {
        match (self.phase, self.route()) {
            (Phase::AwaitingTools, Route::Tools(calls)) => calls,
            _ => &[],
        }
    }

    /// Append the supervisor's reply and advance the phase
    pub fn record_assistant(&mut self, message: Message) -> Result<Phase> {
        if self.phase != Phase::AwaitingModel {
            return Err(ResearchError::InvalidTransition(format!(
                "assistant message received in phase {:?}",
                self.phase
            )));
        }
        if !matches!(message, Message::Assistant { .. }) {
            return Err(ResearchError::InvalidTransition(format!(
                "expected an assistant message, got {}",
                message.role()
            )));
        }

        self.messages.push(message);
        self.phase = match self.route() {
            Route::Tools(_) => Phase::AwaitingTools,
            Route::End => Phase::Terminated,
        };
        Ok(self.phase)
    }

    /// Append one result per pending call, in call order
    pub fn record_tool_results(&mut self, results: Vec<Message>) -> Result<Phase> {
        if self.phase != Phase::AwaitingTools {
            return Err(ResearchError::InvalidTransition(format!(
                "tool results received in phase {:?}",
                self.phase
            )));
        }

        let pending = self.pending_calls();
        if results.len() != pending.len() {
            return Err(ResearchError::InvalidTransition(format!(
                "expected {} tool results, got {}",
                pending.len(),
                results.len()
            )));
        }

        for (call, result) in pending.iter().zip(&results) {
            match result {
                Message::ToolResult { call_id, .. } if *call_id == call.id => {}
                Message::ToolResult { call_id, .. } => {
                    return Err(ResearchError::InvalidTransition(format!(
                        "tool result {} does not answer pending call {}",
                        call_id, call.id
                    )));
                }
                other => {
                    return Err(ResearchError::InvalidTransition(format!(
                        "expected a tool result, got {}",
                        other.role()
                    )));
                }
            }
        }

        self.messages.extend(results);
        self.phase = Phase::AwaitingModel;
        Ok(self.phase)
    }

    /// Text of the final assistant message once terminated
    pub fn final_answer(&self) -> Option<String> {
        if !self.phase.is_terminal() {
            return None;
        }
        self.last().map(Message::text)
    }
}
