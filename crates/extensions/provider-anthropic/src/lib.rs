//! Anthropic LLM provider for webpilot.
//!
//! Tool results of one turn are written back as a single user message made
//! of `tool_result` blocks, as the Messages API expects.

mod api;
mod converter;
mod parser;
mod provider;

pub use provider::{AnthropicProvider, DEFAULT_BASE_URL};
