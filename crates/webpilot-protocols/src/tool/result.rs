//! Tool execution result types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Metadata;

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    /// Text handed back to the model.
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            structured_output: None,
            error: None,
            metadata: HashMap::new(),
        }
    }

    pub fn success_json(content: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            structured_output: Some(output),
            ..Self::success(content)
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            structured_output: None,
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text to show the model: the content on success, the error otherwise.
    pub fn message(&self) -> &str {
        if self.success {
            &self.content
        } else {
            self.error.as_deref().unwrap_or("Unknown error")
        }
    }
}
