//! Message and tool conversion utilities.

use webpilot_protocols::{ContentPart, Message, MessageContent, MessageRole, ToolDefinition};

use crate::api::{ApiContent, ApiMessage, ContentBlock};

/// Convert messages to Anthropic API format.
///
/// System messages are dropped; the system prompt travels in its own field.
/// Per-message tool results become user turns with one `tool_result` block.
pub fn convert_messages(messages: &[Message]) -> Vec<ApiMessage> {
    messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| ApiMessage {
            role: match m.role {
                MessageRole::Assistant => "assistant".to_string(),
                _ => "user".to_string(),
            },
            content: convert_content(m),
        })
        .collect()
}

/// Convert a single message's content.
pub fn convert_content(message: &Message) -> ApiContent {
    if let MessageContent::Parts(parts) = &message.content {
        return ApiContent::Blocks(parts.iter().map(convert_part).collect());
    }

    if message.role == MessageRole::Tool {
        if let Some(ref tool_call_id) = message.tool_call_id {
            return ApiContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: message.content.text(),
                is_error: false,
            }]);
        }
    }

    if !message.tool_calls.is_empty() {
        let mut blocks: Vec<ContentBlock> = vec![];
        let text = message.content.text();
        if !text.is_empty() {
            blocks.push(ContentBlock::Text { text });
        }
        for tc in &message.tool_calls {
            blocks.push(ContentBlock::ToolUse {
                id: tc.id.clone(),
                name: tc.name.clone(),
                input: tc.arguments.clone(),
            });
        }
        return ApiContent::Blocks(blocks);
    }

    ApiContent::Text(message.content.text())
}

fn convert_part(part: &ContentPart) -> ContentBlock {
    match part {
        ContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
        ContentPart::ToolUse { id, name, input } => ContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        },
        ContentPart::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => ContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
            is_error: *is_error,
        },
    }
}

/// Convert tools to Anthropic API format.
pub fn convert_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools.iter().map(ToolDefinition::to_anthropic_tool).collect()
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
