//! Adapters from the loaded configuration to the runtime pieces.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use webpilot_agent::OrchestratorConfig;
use webpilot_config::{Config, LlmConfig, ProviderKind};
use webpilot_protocols::LLMProvider;
use webpilot_provider_anthropic::AnthropicProvider;
use webpilot_provider_openai::OpenAIProvider;
use webpilot_tools_browser::DriverConfig;

/// Build the provider selected by `llm.provider`.
pub(crate) fn build_provider(llm: &LlmConfig) -> Result<Arc<dyn LLMProvider>> {
    let api_key = llm
        .api_key()
        .with_context(|| format!("No API key configured for provider '{}'", llm.provider))?;
    let provider: Arc<dyn LLMProvider> = match llm.provider {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(api_key, llm.model())),
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(api_key, llm.model())),
    };
    Ok(provider)
}

pub(crate) fn driver_config(config: &Config) -> DriverConfig {
    let browser = &config.browser;
    DriverConfig {
        debug_port: browser.debug_port,
        headless: browser.headless,
        timeout_ms: browser.timeout_ms,
        viewport_width: browser.viewport_width,
        viewport_height: browser.viewport_height,
        user_data_dir: browser.user_data_dir.clone(),
        chrome_path: browser.chrome_path.clone(),
        action_delay: Duration::try_from_secs_f64(config.agent.action_delay_secs).unwrap_or_default(),
    }
}

pub(crate) fn orchestrator_config(config: &Config, run_dir: PathBuf) -> OrchestratorConfig {
    let agent = &config.agent;
    OrchestratorConfig {
        max_steps: agent.max_steps,
        max_retries: agent.max_retries,
        max_history_steps: agent.max_history_steps,
        max_observation_length: agent.max_observation_length,
        max_tokens: Some(config.llm.max_tokens),
        run_dir: Some(run_dir),
    }
}
