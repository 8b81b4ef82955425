//! Supervisor step - one model call per turn.

use std::sync::Arc;

use log::debug;

use crate::conversation::{ConversationState, Phase};
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, ToolDefinition};

/// Settings for the supervisor's model calls.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Documents listed in the directive as present in the internal index
    pub available_documents: Vec<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            available_documents: vec!["Google.pdf".to_string()],
            max_tokens: 4096,
            temperature: Some(0.0),
        }
    }
}

/// Decides, through the model, whether to answer or call tools.
pub struct Supervisor {
    llm: Arc<dyn LlmClient>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_config(llm, SupervisorConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmClient>, config: SupervisorConfig) -> Self {
        Self { llm, config }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Build the system directive sent ahead of the conversation.
    pub fn directive(&self) -> String {
        let documents = if self.config.available_documents.is_empty() {
            "(none)".to_string()
        } else {
            self.config.available_documents.join(", ")
        };

        format!(
            "You are a research supervisor. You have access to:\n\
             1. academic_search: arXiv search for scientific papers.\n\
             2. web_search: web search for general and current information.\n\
             3. document_search: search over the internal document index.\n\n\
             Available documents in the internal index: {}\n\n\
             Directions:\n\
             - If the user asks for a summary or search of internal data, use document_search.\n\
             - If document_search finds nothing relevant, fall back to web_search or academic_search.\n\
             - When you receive tool results, do not just say you found information. \
             Use the retrieved content to give a detailed, complete answer.\n\
             - If the retrieved information is insufficient, say so, but always synthesize what you have.",
            documents
        )
    }

    /// Run one supervisor turn: call the model with the whole conversation and
    /// append its reply.
    ///
    /// On a gateway error nothing is appended and the error is returned.
    pub async fn step(&self, state: &mut ConversationState, tools: &[ToolDefinition]) -> Result<Phase> {
        let mut request = CompletionRequest::new(self.directive())
            .with_messages(state.messages().to_vec())
            .with_tools(tools.to_vec())
            .with_max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.llm.complete(request).await?;

        debug!(
            "Supervisor usage: input={} output={} total={} stop={:?}",
            response.usage.input_tokens,
            response.usage.output_tokens,
            response.usage.total(),
            response.stop_reason
        );

        state.record_assistant(response.into_message())
    }
}
