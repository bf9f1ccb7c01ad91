//! Response parsing utilities.

use webpilot_protocols::{ChatResponse, StopReason, ToolCall, Usage};

use crate::api::{ApiResponse, ContentBlock};

/// Parse API response to ChatResponse.
pub fn parse_response(response: ApiResponse) -> ChatResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input));
            }
            _ => {}
        }
    }

    ChatResponse {
        id: response.id,
        model: response.model,
        content: (!text.is_empty()).then_some(text),
        stop_reason: parse_stop_reason(response.stop_reason.as_deref()),
        tool_calls,
        usage: Usage::new(response.usage.input_tokens, response.usage.output_tokens),
    }
}

/// Parse stop reason string.
pub fn parse_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("max_tokens") => StopReason::MaxTokens,
        Some("tool_use") => StopReason::ToolUse,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
