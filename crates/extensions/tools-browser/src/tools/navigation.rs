//! Navigation tools: navigate, current URL, back.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use webpilot_protocols::{BrowserDriver, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use super::{json_result, parse_params};

#[derive(Debug, Deserialize)]
pub struct NavigateParams {
    pub url: String,
}

/// Navigate to URL tool.
pub struct NavigateTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl NavigateTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "navigate_to_url",
                "Navigate the browser to a specific URL. Use this to go to websites.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The full URL to navigate to (must include http:// or https://)"
                    }
                },
                "required": ["url"]
            })),
            driver,
        }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: NavigateParams = parse_params(params)?;

        self.driver.navigate(&params.url).await?;
        let url = self.driver.current_url().await?;

        debug!("Navigated to {}", url);
        Ok(json_result(json!({"success": true, "url": url})))
    }
}

/// Current URL tool.
pub struct GetCurrentUrlTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl GetCurrentUrlTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new("get_current_url", "Get the current page URL."),
            driver,
        }
    }
}

#[async_trait]
impl Tool for GetCurrentUrlTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let url = self.driver.current_url().await?;
        Ok(json_result(json!({"url": url})))
    }
}

/// History back tool.
pub struct BackTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl BackTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "back",
                "Navigate back to the previous page in browser history.",
            ),
            driver,
        }
    }
}

#[async_trait]
impl Tool for BackTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        self.driver.go_back().await?;
        let url = self.driver.current_url().await?;
        Ok(json_result(json!({"success": true, "url": url})))
    }
}
