//! OpenAI provider implementation.

use async_trait::async_trait;
use tracing::debug;

use webpilot_protocols::{ChatRequest, ChatResponse, LLMProvider, ProviderError};

use crate::api::{ApiErrorBody, ApiRequest, ApiResponse};
use crate::converter::{convert_messages, convert_tools};
use crate::parser::parse_response;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI LLM provider.
///
/// Uses the default per-message formatting: every tool result is its own
/// `tool` message referencing the call id.
pub struct OpenAIProvider {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_url(api_key, model, DEFAULT_API_URL)
    }

    /// Create provider with custom API URL (for OpenAI-compatible APIs).
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
            messages: convert_messages(request.system.as_deref(), &request.messages),
            max_tokens: request.max_tokens,
            tools: convert_tools(&request.tools),
        }
    }

    async fn send_request(&self, api_request: &ApiRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ProviderError::from_api_response(status, message));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
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
            "Sending OpenAI request"
        );
        let response = self.send_request(&api_request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_response(api_response)
    }
}
