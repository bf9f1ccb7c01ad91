//! Interaction tools: click, type, press, scroll, wait, hover.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use webpilot_protocols::{BrowserDriver, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use super::{ellipsize, is_blank, json_result, missing_selector, parse_params};

/// Longest accepted `wait`.
pub const MAX_WAIT_SECS: f64 = 10.0;

const SELECTOR_DESCRIPTION: &str =
    "The EXACT selector value from a query_dom candidate (e.g., '[aria-label=\"Search\"]')";

fn selector_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "selector": {"type": "string", "description": SELECTOR_DESCRIPTION}
        },
        "required": ["selector"]
    })
}

#[derive(Debug, Deserialize)]
pub struct SelectorParams {
    #[serde(default)]
    pub selector: String,
}

// ============================================================================
// Click
// ============================================================================

pub struct ClickTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl ClickTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "click",
                "Click an element. You MUST provide the 'selector' from a query_dom result. \
                 NEVER call this with an empty selector - always get the selector from query_dom first.",
            )
            .with_parameters_schema(selector_schema()),
            driver,
        }
    }
}

#[async_trait]
impl Tool for ClickTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: SelectorParams = parse_params(params)?;
        if is_blank(&params.selector) {
            return Ok(missing_selector("elements"));
        }

        self.driver.click(&params.selector).await?;
        debug!("Clicked {}", params.selector);
        Ok(json_result(json!({"success": true, "clicked": params.selector})))
    }
}

// ============================================================================
// Type
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TypeTextParams {
    #[serde(default)]
    pub selector: String,
    pub text: String,
    #[serde(default = "default_clear")]
    pub clear: bool,
}

fn default_clear() -> bool {
    true
}

pub struct TypeTextTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl TypeTextTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "type_text",
                "Type text into an input field. You MUST provide the 'selector' from a query_dom result. \
                 NEVER call this with an empty selector. \
                 TIP: After typing in a search field, call press(keys='Enter') to submit.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": SELECTOR_DESCRIPTION},
                    "text": {"type": "string", "description": "Text to type into the element"},
                    "clear": {
                        "type": "boolean",
                        "description": "Whether to clear existing text first (default: true)"
                    }
                },
                "required": ["selector", "text"]
            })),
            driver,
        }
    }
}

#[async_trait]
impl Tool for TypeTextTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: TypeTextParams = parse_params(params)?;
        if is_blank(&params.selector) {
            return Ok(missing_selector("the input field"));
        }

        self.driver
            .type_text(&params.selector, &params.text, params.clear)
            .await?;

        Ok(json_result(json!({
            "success": true,
            "typed": ellipsize(&params.text, 50),
            "hint": "If this is a search field, call press(keys='Enter') to submit",
        })))
    }
}

// ============================================================================
// Press
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PressParams {
    pub keys: String,
}

pub struct PressTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl PressTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "press",
                "Press keyboard keys. Examples: Enter, Escape, Tab, ArrowDown.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "keys": {"type": "string", "description": "Key or key combination to press"}
                },
                "required": ["keys"]
            })),
            driver,
        }
    }
}

#[async_trait]
impl Tool for PressTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: PressParams = parse_params(params)?;
        self.driver.press_key(&params.keys).await?;
        Ok(json_result(json!({"success": true, "pressed": params.keys})))
    }
}

// ============================================================================
// Scroll
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScrollParams {
    pub amount: i64,
}

pub struct ScrollTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl ScrollTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "scroll",
                "Scroll the page. Positive values scroll down, negative scroll up.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "amount": {
                        "type": "integer",
                        "description": "Pixels to scroll (positive=down, negative=up)."
                    }
                },
                "required": ["amount"]
            })),
            driver,
        }
    }
}

#[async_trait]
impl Tool for ScrollTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: ScrollParams = parse_params(params)?;
        self.driver.scroll(params.amount).await?;

        let direction = if params.amount > 0 { "down" } else { "up" };
        Ok(json_result(json!({
            "success": true,
            "scrolled": format!("{}px {}", params.amount.unsigned_abs(), direction),
        })))
    }
}

// ============================================================================
// Wait
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    pub seconds: f64,
}

pub struct WaitTool {
    definition: ToolDefinition,
}

impl WaitTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                "wait",
                "Wait for a specified number of seconds. Use when the page needs time to load.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "seconds": {"type": "number", "description": "Seconds to wait (max 10)"}
                },
                "required": ["seconds"]
            })),
        }
    }
}

impl Default for WaitTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WaitTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: WaitParams = parse_params(params)?;
        let seconds = params.seconds.clamp(0.0, MAX_WAIT_SECS);
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        Ok(json_result(json!({"success": true, "waited": format!("{}s", seconds)})))
    }
}

// ============================================================================
// Hover
// ============================================================================

pub struct HoverTool {
    definition: ToolDefinition,
    driver: Arc<dyn BrowserDriver>,
}

impl HoverTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "hover",
                "Hover over an element. Use the 'selector' from a query_dom result.",
            )
            .with_parameters_schema(selector_schema()),
            driver,
        }
    }
}

#[async_trait]
impl Tool for HoverTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: SelectorParams = parse_params(params)?;
        if is_blank(&params.selector) {
            return Ok(missing_selector("the element"));
        }

        self.driver.hover(&params.selector).await?;
        Ok(json_result(json!({"success": true, "hovered": params.selector})))
    }
}
