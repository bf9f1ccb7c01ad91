//! Tool definition types.

use serde::{Deserialize, Serialize};

/// Name, description and parameter schema advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name, as the model will call it.
    pub name: String,

    pub description: String,

    /// JSON Schema for the parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters_schema: Option<serde_json::Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema: None,
        }
    }

    pub fn with_parameters_schema(mut self, schema: serde_json::Value) -> Self {
        self.parameters_schema = Some(schema);
        self
    }

    /// Schema to send to providers; tools without parameters get an empty object.
    pub fn schema(&self) -> serde_json::Value {
        self.parameters_schema
            .clone()
            .unwrap_or_else(empty_object_schema)
    }

    /// Convert to OpenAI function calling format.
    pub fn to_openai_function(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.schema()
            }
        })
    }

    /// Convert to Anthropic tool format.
    pub fn to_anthropic_tool(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.schema()
        })
    }
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
