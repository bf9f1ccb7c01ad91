//! # webpilot protocols
//!
//! Interface definitions shared by the webpilot crates. Contains only
//! traits and plain data types, no implementations.
//!
//! ## Core Traits
//!
//! - [`Tool`] - a callable entry in the tool catalog
//! - [`LLMProvider`] - a language model plus its message-format adapters
//! - [`BrowserDriver`] - the browser automation capability consumed by the agent

pub mod browser;
pub mod error;
pub mod provider;
pub mod tool;
pub mod types;

pub use browser::{BoundingBox, BrowserDriver, ElementAncestor, RawElement, ScrollPosition};
pub use error::{AgentError, BrowserError, ProviderError, ToolError};
pub use provider::{ChatRequest, ChatResponse, LLMProvider, ToolOutcome};
pub use tool::{AbortSignal, Tool, ToolContext, ToolDefinition, ToolResult};
pub use types::*;
