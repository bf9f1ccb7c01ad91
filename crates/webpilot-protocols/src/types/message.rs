//! Message types for conversations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::common::Metadata;
use super::content::MessageContent;

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,

    pub content: MessageContent,

    /// Tool calls made in this message (assistant messages only).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCall>,

    /// Tool call this message answers (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: Metadata,
}

impl Message {
    fn with_role(role: MessageRole, content: MessageContent) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, MessageContent::Text(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, MessageContent::Text(content.into()))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, MessageContent::Text(content.into()))
    }

    /// Create a tool response message.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(MessageRole::Tool, MessageContent::Text(content.into()));
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Build a user message from structured parts.
    pub fn user_parts(parts: Vec<super::ContentPart>) -> Self {
        Self::with_role(MessageRole::User, MessageContent::Parts(parts))
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, MessageRole::User);
        assert_eq!(Message::assistant("hi").role, MessageRole::Assistant);
        assert_eq!(Message::system("hi").role, MessageRole::System);

        let tool = Message::tool("call_1", "Clicked");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool.content.text(), "Clicked");
    }

    #[test]
    fn test_with_tool_calls() {
        let msg = Message::assistant("")
            .with_tool_calls(vec![ToolCall::new("c1", "navigate_to_url", json!({"url": "https://a.b"}))]);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].name, "navigate_to_url");
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
        assert!(json.get("metadata").is_none());
    }
}
