//! Message and tool conversion for OpenAI API.

use webpilot_protocols::{ContentPart, Message, MessageContent, MessageRole, ToolDefinition};

use crate::api::{ApiMessage, FunctionCall, ToolCall};

/// Convert protocol messages to OpenAI API format.
///
/// The system prompt, when present, becomes the leading `system` message.
/// Bundled `tool_result` parts are split into one `tool` message each.
pub fn convert_messages(system: Option<&str>, messages: &[Message]) -> Vec<ApiMessage> {
    let mut converted = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system {
        converted.push(text_message("system", system.to_string()));
    }
    for msg in messages {
        convert_message(msg, &mut converted);
    }
    converted
}

fn convert_message(msg: &Message, out: &mut Vec<ApiMessage>) {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    };

    // Tool results carried as parts
    if let MessageContent::Parts(parts) = &msg.content {
        let mut results = parts.iter().filter_map(|part| match part {
            ContentPart::ToolResult {
                tool_use_id,
                content,
                ..
            } => Some(tool_message(tool_use_id.clone(), content.clone())),
            _ => None,
        });
        if let Some(first) = results.next() {
            out.push(first);
            out.extend(results);
            return;
        }
    }

    if msg.role == MessageRole::Tool {
        out.push(tool_message(
            msg.tool_call_id.clone().unwrap_or_default(),
            msg.content.text(),
        ));
        return;
    }

    if !msg.tool_calls.is_empty() {
        let tool_calls = msg.tool_calls.iter().map(convert_tool_call).collect();
        let text = msg.content.text();
        out.push(ApiMessage {
            role: role.to_string(),
            content: (!text.is_empty()).then_some(text),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
        return;
    }

    out.push(text_message(role, msg.content.text()));
}

fn text_message(role: &str, content: String) -> ApiMessage {
    ApiMessage {
        role: role.to_string(),
        content: Some(content),
        tool_calls: None,
        tool_call_id: None,
    }
}

fn tool_message(tool_call_id: String, content: String) -> ApiMessage {
    ApiMessage {
        role: "tool".to_string(),
        content: Some(content),
        tool_calls: None,
        tool_call_id: Some(tool_call_id),
    }
}

fn convert_tool_call(call: &webpilot_protocols::ToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

/// Convert tool definitions for OpenAI API.
pub fn convert_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools.iter().map(ToolDefinition::to_openai_function).collect()
}
