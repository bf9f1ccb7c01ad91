//! Chat response types.

use serde::{Deserialize, Serialize};

use crate::types::{StopReason, ToolCall, Usage};

/// Provider-neutral assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,

    pub model: String,

    /// Free text of the turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    pub stop_reason: StopReason,

    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    /// A text-only turn.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    /// A turn that requests tool calls.
    pub fn tool_use(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            content,
            tool_calls,
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Content text, empty when the turn had none.
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Outcome of one tool call, ready to be written back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}
