//! Test doubles for the loop: a driver, a scripted provider and tools.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use webpilot_protocols::{
    BrowserDriver, BrowserError, ChatRequest, ChatResponse, LLMProvider, ProviderError,
    RawElement, Tool, ToolContext, ToolDefinition, ToolError, ToolResult,
};

/// In-memory page: one URL, canned `evaluate` answers, a call log.
pub struct MockDriver {
    url: Mutex<String>,
    disconnected: AtomicBool,
    evaluations: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            url: Mutex::new("https://shop.example/".to_string()),
            disconnected: AtomicBool::new(false),
            evaluations: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockDriver {
    pub fn with_url(url: &str) -> Self {
        let driver = Self::default();
        *driver.url.lock().unwrap() = url.to_string();
        driver
    }

    /// Make page reads fail as if the tab had gone away.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn set_evaluate(&self, expression: &str, value: Value) {
        self.evaluations
            .lock()
            .unwrap()
            .insert(expression.to_string(), value);
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("navigate:{}", url));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(BrowserError::NotConnected);
        }
        Ok(self.url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok("Mock shop".to_string())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("click:{}", selector));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, _clear: bool) -> Result<(), BrowserError> {
        self.record(format!("type:{}:{}", selector, text));
        Ok(())
    }

    async fn press_key(&self, keys: &str) -> Result<(), BrowserError> {
        self.record(format!("press:{}", keys));
        Ok(())
    }

    async fn scroll(&self, delta_y: i64) -> Result<(), BrowserError> {
        self.record(format!("scroll:{}", delta_y));
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("hover:{}", selector));
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.record("back".to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<(), BrowserError> {
        self.record(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn visible_text(&self, max_len: usize) -> Result<String, BrowserError> {
        Ok("Fresh milk 1L. Add to cart.".chars().take(max_len).collect())
    }

    async fn interactive_elements(&self) -> Result<Vec<RawElement>, BrowserError> {
        Ok(Vec::new())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        Ok(self
            .evaluations
            .lock()
            .unwrap()
            .get(expression)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn close_popups(&self) -> Result<bool, BrowserError> {
        self.record("close_popups".to_string());
        Ok(false)
    }
}

/// Replays canned responses; the last one repeats once the script runs out.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    fallback: ChatResponse,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ChatResponse>) -> Self {
        let fallback = script
            .last()
            .cloned()
            .unwrap_or_else(|| ChatResponse::text("DONE: nothing to do"));
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same response for every call.
    pub fn repeating(response: ChatResponse) -> Self {
        Self::new(vec![response])
    }

    /// Queue an error before the scripted responses.
    pub fn fail_first(self, error: ProviderError) -> Self {
        self.script.lock().unwrap().push_front(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(next) => next,
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Tool with a fixed outcome that records the arguments it saw.
pub struct MockTool {
    definition: ToolDefinition,
    failure: Option<String>,
    calls: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn ok(name: &str) -> Self {
        Self {
            definition: ToolDefinition::new(name, "A mock tool"),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::ok(name)
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        self.calls.lock().unwrap().push(params);
        match &self.failure {
            Some(message) => Err(ToolError::ExecutionFailed(message.clone())),
            None => Ok(ToolResult::success(format!("{} done", self.definition.name))),
        }
    }
}
