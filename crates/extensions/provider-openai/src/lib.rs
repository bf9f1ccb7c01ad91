//! OpenAI LLM provider for webpilot.
//!
//! Each tool result is written back as its own `tool` message.

mod api;
mod converter;
mod parser;
mod provider;

pub use provider::{DEFAULT_API_URL, OpenAIProvider};
