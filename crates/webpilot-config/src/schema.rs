//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Which model API to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAI,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default, skip_serializing)]
    pub anthropic_api_key: Option<String>,

    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmConfig {
    /// API key for the selected provider.
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::OpenAI => self.openai_api_key.as_deref(),
        }
        .filter(|k| !k.is_empty())
    }

    /// Model name for the selected provider.
    pub fn model(&self) -> &str {
        match self.provider {
            ProviderKind::Anthropic => &self.anthropic_model,
            ProviderKind::OpenAI => &self.openai_model,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_model: default_anthropic_model(),
            openai_model: default_openai_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub headless: bool,

    /// Per-action timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Persistent profile directory.
    #[serde(default = "default_user_data_dir")]
    pub user_data_dir: PathBuf,

    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Chrome executable; located automatically when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            timeout_ms: default_timeout_ms(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_data_dir: default_user_data_dir(),
            debug_port: default_debug_port(),
            chrome_path: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    900
}

fn default_user_data_dir() -> PathBuf {
    PathBuf::from("./profiles/default")
}

fn default_debug_port() -> u16 {
    9222
}

/// Interaction loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Default `limit` for `query_dom`.
    #[serde(default = "default_query_dom_limit")]
    pub query_dom_limit: usize,

    /// Steps kept verbatim in the prompt history.
    #[serde(default = "default_max_history_steps")]
    pub max_history_steps: usize,

    /// Pause after each tool call.
    #[serde(default = "default_action_delay_secs")]
    pub action_delay_secs: f64,

    /// Visible text budget for each observation.
    #[serde(default = "default_max_observation_length")]
    pub max_observation_length: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_retries: default_max_retries(),
            query_dom_limit: default_query_dom_limit(),
            max_history_steps: default_max_history_steps(),
            action_delay_secs: default_action_delay_secs(),
            max_observation_length: default_max_observation_length(),
        }
    }
}

fn default_max_steps() -> u32 {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_query_dom_limit() -> usize {
    12
}

fn default_max_history_steps() -> usize {
    10
}

fn default_action_delay_secs() -> f64 {
    0.5
}

fn default_max_observation_length() -> usize {
    2000
}

/// Where run artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
        }
    }
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("./runs")
}
