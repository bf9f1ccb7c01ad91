//! DOM query tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use webpilot_protocols::{BrowserDriver, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use crate::dom::{
    Candidate, CandidateAnalyst, CandidateEngine, POSITION_FALLBACK_PREFIX, regenerate_selector,
};

use super::{json_result, parse_params};

/// Default `get_all_elements` limit.
pub const DEFAULT_ALL_ELEMENTS_LIMIT: usize = 30;

const LABEL_MAX_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct QueryDomParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

/// Candidate search tool.
pub struct QueryDomTool {
    definition: ToolDefinition,
    engine: CandidateEngine,
    analyst: CandidateAnalyst,
    default_limit: usize,
}

impl QueryDomTool {
    pub fn new(driver: Arc<dyn BrowserDriver>, default_limit: usize) -> Self {
        Self {
            definition: ToolDefinition::new(
                "query_dom",
                "Search for interactive elements on the page. Returns candidates with a 'selector' field. \
                 IMPORTANT: You MUST use query_dom FIRST, then copy the EXACT 'selector' value from \
                 the result and use it in click() or type_text(). \
                 Example workflow: \
                 1. query_dom('search') -> returns candidates with selectors \
                 2. Pick the best candidate \
                 3. Use its 'selector' value in type_text(selector=..., text=...)",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query to match elements. Examples: 'search', 'login', 'submit', \
                                        'email input', 'add to cart'. Leave empty to get all interactive elements."
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!("Maximum number of results (default: {})", default_limit)
                    }
                },
                "required": ["query"]
            })),
            engine: CandidateEngine::new(driver),
            analyst: CandidateAnalyst::new(),
            default_limit,
        }
    }

    pub fn with_analyst(mut self, analyst: CandidateAnalyst) -> Self {
        self.analyst = analyst;
        self
    }
}

#[async_trait]
impl Tool for QueryDomTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: QueryDomParams = parse_params(params)?;
        let limit = params.limit.unwrap_or(self.default_limit);

        let candidates = with_usable_selectors(self.engine.query(&params.query, limit).await?);

        let recommended = self.analyst.select(&params.query, &candidates).await;
        debug!(
            query = %params.query,
            found = candidates.len(),
            recommended = ?recommended.as_ref().map(|r| r.candidate_id),
            "query_dom"
        );

        let usage_hint = candidates
            .first()
            .map(|c| {
                format!(
                    "Use click(selector=\"{0}\") or type_text(selector=\"{0}\", text=\"...\")",
                    c.selector
                )
            })
            .unwrap_or_default();

        let mut output = json!({
            "candidates": candidates.iter().map(candidate_json).collect::<Vec<_>>(),
            "total_found": candidates.len(),
            "query": params.query,
            "usage_hint": usage_hint,
        });
        if let Some(pick) = recommended {
            output["recommended"] = json!(pick);
        }

        Ok(json_result(output))
    }
}

/// Selector to hand to the model, regenerating position fallbacks.
/// Drop candidates without a usable selector and renumber the rest from 0.
pub(super) fn with_usable_selectors(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.retain_mut(|c| match usable_selector(c) {
        Some(selector) => {
            c.selector = selector;
            true
        }
        None => false,
    });
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.id = i;
    }
    candidates
}

pub(super) fn usable_selector(candidate: &Candidate) -> Option<String> {
    let selector = if candidate.selector.is_empty() || candidate.selector.starts_with(POSITION_FALLBACK_PREFIX) {
        regenerate_selector(
            &candidate.tag,
            &candidate.aria_label,
            &candidate.placeholder,
            &candidate.name,
            &candidate.text,
            &candidate.css_path,
        )
        .unwrap_or_else(|| candidate.selector.clone())
    } else {
        candidate.selector.clone()
    };

    (!selector.is_empty() && selector != "body").then_some(selector)
}

fn candidate_json(candidate: &Candidate) -> Value {
    let mut entry = Map::new();
    entry.insert("id".into(), json!(candidate.id));
    entry.insert("role".into(), json!(candidate.role));
    entry.insert("text".into(), json!(candidate.text));
    entry.insert("selector".into(), json!(candidate.selector));
    for (key, value) in [
        ("aria_label", &candidate.aria_label),
        ("placeholder", &candidate.placeholder),
        ("name", &candidate.name),
    ] {
        if !value.is_empty() {
            entry.insert(key.into(), json!(cut(value, LABEL_MAX_CHARS)));
        }
    }
    entry.insert("position".into(), json!(candidate.position()));
    entry.insert("in_viewport".into(), json!(candidate.in_viewport));
    Value::Object(entry)
}

fn cut(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[derive(Debug, Deserialize)]
pub struct GetAllElementsParams {
    #[serde(default = "default_all_limit")]
    pub limit: usize,
}

fn default_all_limit() -> usize {
    DEFAULT_ALL_ELEMENTS_LIMIT
}

/// Unfiltered element listing, for when `query_dom` finds nothing.
pub struct GetAllElementsTool {
    definition: ToolDefinition,
    engine: CandidateEngine,
}

impl GetAllElementsTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "get_all_elements",
                "Get ALL visible interactive elements on the page without text filtering. \
                 Use this when query_dom returns no results to see what elements exist. \
                 Returns up to 30 elements with their text and selectors.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of elements to return (default: 30)"
                    }
                },
                "required": []
            })),
            engine: CandidateEngine::new(driver),
        }
    }
}

#[async_trait]
impl Tool for GetAllElementsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let params: GetAllElementsParams = if params.is_null() {
            GetAllElementsParams { limit: DEFAULT_ALL_ELEMENTS_LIMIT }
        } else {
            parse_params(params)?
        };

        let candidates = self.engine.query("", params.limit).await?;
        let elements: Vec<Value> = candidates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                json!({
                    "index": index,
                    "tag": c.tag,
                    "text": cut(&c.text, 60),
                    "identifier": identifier(c),
                    "selector": c.selector,
                })
            })
            .collect();

        Ok(json_result(json!({
            "total": elements.len(),
            "elements": elements,
            "hint": "Use the 'selector' value with click() or type_text()",
        })))
    }
}

/// Best human-readable handle for a candidate.
fn identifier(candidate: &Candidate) -> String {
    let text = cut(&candidate.text, 30);
    let selector = cut(&candidate.selector, 50);
    [
        candidate.aria_label.as_str(),
        candidate.placeholder.as_str(),
        candidate.name.as_str(),
        text.as_str(),
        selector.as_str(),
    ]
    .into_iter()
    .find(|v| !v.is_empty())
    .map(|v| cut(v, LABEL_MAX_CHARS))
    .unwrap_or_else(|| "N/A".to_string())
}
