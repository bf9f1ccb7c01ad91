//! Anthropic provider implementation.

use async_trait::async_trait;
use tracing::debug;

use webpilot_protocols::{
    ChatRequest, ChatResponse, ContentPart, LLMProvider, Message, MessageContent,
    ProviderError, ToolOutcome,
};

use crate::api::{ApiErrorBody, ApiRequest, ApiResponse};
use crate::converter::{convert_messages, convert_tools};
use crate::parser::parse_response;

/// Messages endpoint of the public API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic LLM provider.
pub struct AnthropicProvider {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create provider against a custom endpoint (proxies, test servers).
    pub fn with_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, request: &ChatRequest) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: convert_messages(&request.messages),
            system: request.system.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            tools: convert_tools(&request.tools),
        }
    }

    async fn send_request(&self, api_request: &ApiRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_api_response(status, message));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let api_request = self.build_request(&request);
        debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            tools = api_request.tools.len(),
            "Sending Anthropic request"
        );
        let response = self.send_request(&api_request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(parse_response(api_response))
    }

    /// Assistant turns keep their `tool_use` blocks so results can refer to them.
    fn format_assistant_message(&self, response: &ChatResponse) -> Message {
        let mut parts = Vec::with_capacity(response.tool_calls.len() + 1);
        let text = response.content_text();
        if !text.is_empty() {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        for call in &response.tool_calls {
            parts.push(ContentPart::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            });
        }
        let mut message = Message::assistant("").with_tool_calls(response.tool_calls.clone());
        message.content = MessageContent::Parts(parts);
        message
    }

    fn format_tool_result(&self, outcome: &ToolOutcome) -> Message {
        Message::user_parts(vec![tool_result_part(outcome)])
    }

    /// Every result of the turn goes into one user message.
    fn format_tool_results(&self, outcomes: &[ToolOutcome]) -> Vec<Message> {
        if outcomes.is_empty() {
            return Vec::new();
        }
        vec![Message::user_parts(
            outcomes.iter().map(tool_result_part).collect(),
        )]
    }
}

fn tool_result_part(outcome: &ToolOutcome) -> ContentPart {
    ContentPart::ToolResult {
        tool_use_id: outcome.tool_call_id.clone(),
        content: outcome.content.clone(),
        is_error: outcome.is_error,
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
