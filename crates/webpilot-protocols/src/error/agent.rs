//! Agent errors.

use thiserror::Error;

use super::{BrowserError, ProviderError};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Agent was aborted")]
    Aborted,
}
