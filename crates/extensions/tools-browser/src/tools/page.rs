//! Page tools: screenshots and popup dismissal.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use webpilot_protocols::{BrowserDriver, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use super::{json_result, parse_params};

/// Subdirectory of the run directory that receives screenshots.
pub const SCREENSHOTS_DIR: &str = "screenshots";

#[derive(Debug, Default, Deserialize)]
pub struct ScreenshotParams {
    #[serde(default)]
    pub full_page: bool,
}

/// Numbered screenshot tool. Files land in `<work_dir>/screenshots/`.
pub struct ScreenshotTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
    counter: AtomicU32,
}

impl ScreenshotTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new("take_screenshot", "Take a screenshot of the current page.")
                .with_parameters_schema(json!({
                    "type": "object",
                    "properties": {
                        "full_page": {
                            "type": "boolean",
                            "description": "Whether to capture the full scrollable page (default: false)"
                        }
                    },
                    "required": []
                })),
            driver,
            counter: AtomicU32::new(0),
        }
    }

    fn next_path(&self, ctx: &ToolContext) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.work_dir
            .join(SCREENSHOTS_DIR)
            .join(format!("screenshot_{:04}.png", n))
    }
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: ScreenshotParams = if params.is_null() {
            ScreenshotParams::default()
        } else {
            parse_params(params)?
        };

        let path = self.next_path(&ctx);
        self.driver.screenshot(&path, params.full_page).await?;

        Ok(json_result(json!({
            "success": true,
            "path": path.display().to_string(),
            "full_page": params.full_page,
        })))
    }
}

/// Popup dismissal tool.
pub struct ClosePopupsTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl ClosePopupsTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "close_popups",
                "Try to close any visible popups, modals, or cookie banners.",
            ),
            driver,
        }
    }
}

#[async_trait]
impl Tool for ClosePopupsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let closed = self.driver.close_popups().await?;
        Ok(json_result(json!({"success": true, "closed": closed})))
    }
}
