//! LLM Provider trait definition.

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ToolOutcome};
use crate::error::ProviderError;
use crate::types::{Message, ToolCall};

/// Core trait for LLM providers.
///
/// The agent loop only talks to providers through this trait. The two
/// `format_*` hooks let each API decide how assistant turns and tool results
/// are written back into the conversation.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the provider ID.
    fn id(&self) -> &str;

    /// Model used when the request does not override it.
    fn model(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Conversation entry recording an assistant turn.
    fn format_assistant_message(&self, response: &ChatResponse) -> Message {
        Message::assistant(response.content_text()).with_tool_calls(response.tool_calls.clone())
    }

    /// Conversation entry carrying a single tool result.
    fn format_tool_result(&self, outcome: &ToolOutcome) -> Message {
        Message::tool(outcome.tool_call_id.clone(), outcome.content.clone())
    }

    /// Conversation entries carrying every tool result of one turn.
    ///
    /// Defaults to one message per result.
    fn format_tool_results(&self, outcomes: &[ToolOutcome]) -> Vec<Message> {
        outcomes.iter().map(|o| self.format_tool_result(o)).collect()
    }
}

/// Tool calls whose ids are missing get a stable generated one.
pub fn ensure_tool_call_ids(calls: &mut [ToolCall]) {
    for (i, call) in calls.iter_mut().enumerate() {
        if call.id.is_empty() {
            call.id = format!("call_{}", i);
        }
    }
}
