//! Browser tool catalog.

mod dom;
mod interaction;
mod navigation;
mod page;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use webpilot_protocols::{BrowserDriver, Tool, ToolError, ToolResult};

use crate::dom::CandidateAnalyst;

pub use dom::*;
pub use interaction::*;
pub use navigation::*;
pub use page::*;

/// Default `query_dom` result limit.
pub const DEFAULT_QUERY_DOM_LIMIT: usize = 12;

/// Settings shared by the catalog.
#[derive(Clone, Default)]
pub struct BrowserToolOptions {
    /// `query_dom` limit when the model does not pass one.
    pub query_dom_limit: Option<usize>,
    /// Picks a recommended candidate for `query_dom` results.
    pub analyst: CandidateAnalyst,
}

/// Every browser tool, bound to one driver.
pub fn browser_tools(driver: Arc<dyn BrowserDriver>, options: BrowserToolOptions) -> Vec<Arc<dyn Tool>> {
    let limit = options.query_dom_limit.unwrap_or(DEFAULT_QUERY_DOM_LIMIT);
    vec![
        Arc::new(NavigateTool::new(driver.clone())),
        Arc::new(GetCurrentUrlTool::new(driver.clone())),
        Arc::new(ClickTool::new(driver.clone())),
        Arc::new(TypeTextTool::new(driver.clone())),
        Arc::new(PressTool::new(driver.clone())),
        Arc::new(ScrollTool::new(driver.clone())),
        Arc::new(WaitTool::new()),
        Arc::new(HoverTool::new(driver.clone())),
        Arc::new(BackTool::new(driver.clone())),
        Arc::new(ClosePopupsTool::new(driver.clone())),
        Arc::new(ScreenshotTool::new(driver.clone())),
        Arc::new(QueryDomTool::new(driver.clone(), limit).with_analyst(options.analyst)),
        Arc::new(GetAllElementsTool::new(driver)),
    ]
}

pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Structured result whose text is the compact JSON rendering.
pub(crate) fn json_result(output: Value) -> ToolResult {
    ToolResult::success_json(output.to_string(), output)
}

/// Error result for tools that were called without a selector.
pub(crate) fn missing_selector(what: &str) -> ToolResult {
    ToolResult::error(format!(
        "Empty selector provided. You must first call query_dom() to find {}, then use the 'selector' value from the result.",
        what
    ))
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Cut to `max` characters, appending `...` when anything was removed.
pub(crate) fn ellipsize(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max).collect::<String>())
    } else {
        value.to_string()
    }
}
