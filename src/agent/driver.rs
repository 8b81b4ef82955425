//! Driver - runs the supervisor/tools loop to a final answer.
//!
//! The driver owns the turn sequence: supervisor, route, tools, supervisor,
//! until the router says stop. Progress is reported as `TraceEvent`s over an
//! optional channel. Persistence happens only at session boundaries.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use super::Supervisor;
use crate::conversation::{ConversationState, Message, Phase};
use crate::error::{ResearchError, Result};
use crate::session::SessionStore;
use crate::tools::{ToolContext, ToolRegistry};

/// Graph node currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Supervisor,
    Tools,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Supervisor => write!(f, "supervisor"),
            Node::Tools => write!(f, "tools"),
        }
    }
}

/// Progress notifications emitted while a session runs
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    SessionStarted { query: String, prior_messages: usize },
    NodeEntered(Node),
    MessageAppended(Message),
    Terminated { answer: String, turns: u32 },
    Failed { error: String },
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub answer: String,
    /// Supervisor calls made during this run
    pub turns: u32,
}

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Supervisor calls allowed per run; None removes the cap
    pub max_turns: Option<u32>,
    /// Document scope for new sessions
    pub selected_documents: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_turns: Some(25),
            selected_documents: Vec::new(),
        }
    }
}

struct SessionBinding {
    store: Arc<dyn SessionStore>,
    key: String,
}

/// Runs research sessions against a supervisor and a fixed tool registry.
pub struct Driver {
    supervisor: Supervisor,
    tools: Arc<ToolRegistry>,
    config: DriverConfig,
    session: Option<SessionBinding>,
    events: Option<UnboundedSender<TraceEvent>>,
}

impl Driver {
    pub fn new(supervisor: Supervisor, tools: Arc<ToolRegistry>) -> Self {
        Self {
            supervisor,
            tools,
            config: DriverConfig::default(),
            session: None,
            events: None,
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist the conversation under `key` between runs
    pub fn with_session(mut self, store: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        self.session = Some(SessionBinding { store, key: key.into() });
        self
    }

    /// Send trace events to `events` as the run progresses
    pub fn with_events(mut self, events: UnboundedSender<TraceEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Answer `query`, continuing the persisted conversation when one exists.
    ///
    /// The conversation is saved only after the run terminates normally.
    pub async fn run_query(&self, query: &str) -> Result<Outcome> {
        let mut state = self.open_session(query).map_err(|e| self.fail(e))?;
        let outcome = self.run(&mut state).await?;

        if let Some(session) = &self.session {
            session.store.save(&session.key, &state).map_err(|e| self.fail(e))?;
            info!("Saved session {} ({} messages)", session.key, state.len());
        }

        Ok(outcome)
    }

    fn open_session(&self, query: &str) -> Result<ConversationState> {
        if let Some(session) = &self.session {
            if let Some(mut state) = session.store.load(&session.key)? {
                state.resume(query)?;
                info!("Resuming session {} with {} prior messages", session.key, state.len() - 1);
                return Ok(state);
            }
        }

        Ok(ConversationState::new(query).with_documents(self.config.selected_documents.clone()))
    }

    /// Drive `state` to termination.
    ///
    /// Tool failures are recorded as tool results and never end the run. A
    /// gateway failure or an exhausted turn cap ends it with the state left as
    /// it was after the last complete step.
    pub async fn run(&self, state: &mut ConversationState) -> Result<Outcome> {
        let query = state.last().map(Message::text).unwrap_or_default();
        info!("Starting research session ({} messages): {}", state.len(), query);
        self.emit(TraceEvent::SessionStarted {
            query,
            prior_messages: state.len().saturating_sub(1),
        });

        let definitions = self.tools.definitions();
        let mut turns: u32 = 0;

        loop {
            match state.phase() {
                Phase::Terminated => break,
                Phase::AwaitingModel => {
                    if let Some(limit) = self.config.max_turns.filter(|limit| turns >= *limit) {
                        return Err(self.fail(ResearchError::TurnLimit { limit }));
                    }

                    self.emit(TraceEvent::NodeEntered(Node::Supervisor));
                    debug!("Supervisor turn {} ({} messages)", turns + 1, state.len());

                    let before = state.len();
                    if let Err(e) = self.supervisor.step(state, &definitions).await {
                        return Err(self.fail(e));
                    }
                    turns += 1;
                    self.emit_appended(state, before);
                }
                Phase::AwaitingTools => {
                    self.emit(TraceEvent::NodeEntered(Node::Tools));

                    let calls = state.pending_calls().to_vec();
                    debug!(
                        "Executing {} tool call(s): {:?}",
                        calls.len(),
                        calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
                    );

                    let ctx = ToolContext::new(state.selected_documents.clone());
                    let results = self.tools.execute_all(&calls, &ctx).await;

                    let before = state.len();
                    if let Err(e) = state.record_tool_results(results) {
                        return Err(self.fail(e));
                    }
                    self.emit_appended(state, before);
                }
            }
        }

        let answer = state.final_answer().unwrap_or_default();
        info!("Research session finished after {} turn(s)", turns);
        self.emit(TraceEvent::Terminated {
            answer: answer.clone(),
            turns,
        });

        Ok(Outcome { answer, turns })
    }

    fn emit(&self, event: TraceEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }

    fn emit_appended(&self, state: &ConversationState, from: usize) {
        for message in &state.messages()[from..] {
            self.emit(TraceEvent::MessageAppended(message.clone()));
        }
    }

    fn fail(&self, error: ResearchError) -> ResearchError {
        warn!("Research session failed: {}", error);
        self.emit(TraceEvent::Failed {
            error: error.to_string(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolCall;
    use crate::llm::{CompletionResponse, LlmError, MockLlmClient};
    use crate::tools::{Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    struct StaticTool;

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &'static str {
            "web_search"
        }

        fn description(&self) -> &'static str {
            "Returns a fixed result"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn execute(&self, _input: Value, _ctx: &ToolContext) -> std::result::Result<ToolOutput, eyre::Error> {
            Ok(ToolOutput::success("1. Result\n   https://example.com\n   snippet\n"))
        }
    }

    fn tool_call(id: &str) -> CompletionResponse {
        CompletionResponse::with_tool_calls("", vec![ToolCall::new(id, "web_search", json!({"query": "q"}))])
    }

    fn driver(mock: Arc<MockLlmClient>) -> Driver {
        let tools = Arc::new(ToolRegistry::new().with_tool(Box::new(StaticTool)));
        Driver::new(Supervisor::new(mock), tools)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TraceEvent>) -> Vec<TraceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response(CompletionResponse::text("42"));

        let mut state = ConversationState::new("answer?");
        let outcome = driver(mock.clone()).run(&mut state).await.unwrap();

        assert_eq!(outcome, Outcome { answer: "42".to_string(), turns: 1 });
        assert_eq!(state.len(), 2);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_round_trip_emits_trace() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response(tool_call("c1")).push_response(CompletionResponse::text("done"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ConversationState::new("q");
        let outcome = driver(mock).with_events(tx).run(&mut state).await.unwrap();

        assert_eq!(outcome.turns, 2);
        assert_eq!(state.len(), 4);

        let events = drain(&mut rx);
        let nodes: Vec<Node> = events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::NodeEntered(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(nodes, vec![Node::Supervisor, Node::Tools, Node::Supervisor]);
        assert!(matches!(events.first(), Some(TraceEvent::SessionStarted { prior_messages: 0, .. })));
        assert!(matches!(events.last(), Some(TraceEvent::Terminated { turns: 2, .. })));
        assert_eq!(
            events.iter().filter(|e| matches!(e, TraceEvent::MessageAppended(_))).count(),
            3
        );
    }

    #[tokio::test]
    async fn test_gateway_failure() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(LlmError::InvalidResponse("boom".to_string()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ConversationState::new("q");
        let err = driver(mock).with_events(tx).run(&mut state).await.unwrap_err();

        assert!(matches!(err, ResearchError::Gateway(_)));
        assert_eq!(state.len(), 1);
        assert!(matches!(drain(&mut rx).last(), Some(TraceEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response(tool_call("c1"))
            .push_response(tool_call("c2"))
            .push_response(tool_call("c3"));

        let mut state = ConversationState::new("q");
        let err = driver(mock.clone())
            .with_config(DriverConfig {
                max_turns: Some(2),
                ..DriverConfig::default()
            })
            .run(&mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::TurnLimit { limit: 2 }));
        assert_eq!(mock.call_count(), 2);
        // both complete steps were kept
        assert_eq!(state.len(), 5);
        assert_eq!(state.phase(), Phase::AwaitingModel);
    }

    #[tokio::test]
    async fn test_no_turn_limit() {
        let mock = Arc::new(MockLlmClient::new());
        for i in 0..30 {
            mock.push_response(tool_call(&format!("c{}", i)));
        }
        mock.push_response(CompletionResponse::text("finally"));

        let mut state = ConversationState::new("q");
        let outcome = driver(mock)
            .with_config(DriverConfig {
                max_turns: None,
                ..DriverConfig::default()
            })
            .run(&mut state)
            .await
            .unwrap();

        assert_eq!(outcome.turns, 31);
        assert_eq!(outcome.answer, "finally");
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_fail() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response(CompletionResponse::text("ok"));

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let mut state = ConversationState::new("q");
        assert!(driver(mock).with_events(tx).run(&mut state).await.is_ok());
    }
}
