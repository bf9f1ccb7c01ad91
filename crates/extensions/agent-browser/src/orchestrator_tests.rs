use super::*;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use webpilot_protocols::{MessageRole, ProviderError, Tool, ToolDefinition, ToolError, Usage};
use webpilot_tools_browser::{BrowserToolOptions, browser_tools};

use crate::test_support::{MockDriver, MockTool, ScriptedProvider};

fn config(max_steps: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        max_steps,
        ..Default::default()
    }
}

fn build(
    provider: Arc<ScriptedProvider>,
    tools: Vec<Arc<dyn Tool>>,
    max_steps: u32,
) -> (Orchestrator, Arc<MockDriver>) {
    let driver = Arc::new(MockDriver::default());
    let registry = ToolRegistry::from_tools(tools).unwrap();
    let orchestrator = Orchestrator::new(config(max_steps), provider, driver.clone(), registry);
    (orchestrator, driver)
}

fn call(id: &str, name: &str, args: Value) -> ChatResponse {
    ChatResponse::tool_use(None, vec![ToolCall::new(id, name, args)])
}

/// Last message sent in the `n`th request.
fn last_message(provider: &ScriptedProvider, n: usize) -> Message {
    provider.requests()[n].messages.last().cloned().unwrap()
}

/// Tool result messages present in the `n`th request.
fn tool_replies(provider: &ScriptedProvider, n: usize) -> Vec<Message> {
    provider.requests()[n]
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .cloned()
        .collect()
}

struct ApproveAll {
    requests: Mutex<Vec<String>>,
}

impl ApproveAll {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConfirmationHandler for ApproveAll {
    async fn confirm(&self, request: &str) -> bool {
        self.requests.lock().unwrap().push(request.to_string());
        true
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl RunObserver for RecordingObserver {
    async fn on_task_start(&self, task: &str) {
        self.push(format!("start:{}", task));
    }

    async fn on_tool_call(&self, step: usize, tool: &str, _args: &Value, _result: &Value, success: bool) {
        self.push(format!("tool:{}:{}:{}", step, tool, success));
    }

    async fn on_security_check(&self, _request: &str, reason: &str) {
        self.push(format!("security:{}", reason));
    }

    async fn on_recovery(&self, action: &RecoveryAction) {
        self.push(format!("recovery:{}", action.strategy));
    }

    async fn on_final_report(&self, result: &ExecutionResult) {
        self.push(format!("final:{}", result.status));
    }
}

/// Sets the shared stop flag from inside a tool call.
struct StopTool {
    definition: ToolDefinition,
}

#[async_trait]
impl Tool for StopTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<ToolResult, ToolError> {
        ctx.abort_signal.abort();
        Ok(ToolResult::success("stopping"))
    }
}

#[test]
fn test_parse_terminal_marker() {
    assert_eq!(
        parse_terminal_marker("All good. DONE: added milk to cart "),
        Some((AgentStatus::Done, "added milk to cart".to_string()))
    );
    assert_eq!(
        parse_terminal_marker("need_user_input: confirm the order?"),
        Some((AgentStatus::NeedUserInput, "confirm the order?".to_string()))
    );
    assert_eq!(
        parse_terminal_marker("Failed: the site is down"),
        Some((AgentStatus::Failed, "the site is down".to_string()))
    );
    assert_eq!(parse_terminal_marker("Looking for the search box"), None);
    assert_eq!(parse_terminal_marker(""), None);
}

#[test]
fn test_status_is_terminal() {
    assert!(!AgentStatus::Running.is_terminal());
    assert!(AgentStatus::Cancelled.is_terminal());
    assert_eq!(AgentStatus::NeedUserInput.to_string(), "need_user_input");
}

#[tokio::test]
async fn test_done_on_first_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![ChatResponse::text("DONE: nothing needed")]));
    let (mut orchestrator, _driver) = build(provider.clone(), vec![], 10);

    let result = orchestrator.execute_task("check the page").await;

    assert_eq!(result.status, AgentStatus::Done);
    assert_eq!(result.summary, "nothing needed");
    assert_eq!(result.steps_taken, 0);
    assert_eq!(result.final_url, "https://shop.example/");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_first_request_uses_task_prompt() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "wait", json!({"seconds": 1})),
        ChatResponse::text("DONE: ok"),
    ]));
    let (mut orchestrator, _driver) = build(provider.clone(), vec![Arc::new(MockTool::ok("wait"))], 10);
    orchestrator.execute_task("buy milk").await;

    let requests = provider.requests();
    let first = &requests[0];
    assert_eq!(first.system.as_deref(), Some(SYSTEM_PROMPT));
    assert_eq!(first.tools.len(), 1);
    let prompt = first.messages[0].content.text();
    assert!(prompt.starts_with("## Current Task\nbuy milk"));
    assert!(prompt.contains("URL: https://shop.example/"));
    assert!(prompt.contains("No previous actions."));

    let second = last_message(&provider, 1);
    assert_eq!(second.role, MessageRole::User);
    assert!(second.content.text().starts_with("Current state:\nURL: https://shop.example/"));
    assert!(second.content.text().ends_with("Continue with the task."));
}

#[tokio::test]
async fn test_budget_exhaustion() {
    let provider = Arc::new(ScriptedProvider::repeating(call("c1", "wait", json!({"seconds": 1}))));
    let wait = Arc::new(MockTool::ok("wait"));
    let (mut orchestrator, _driver) = build(provider.clone(), vec![wait.clone()], 3);

    let result = orchestrator.execute_task("loop forever").await;

    assert_eq!(result.status, AgentStatus::Failed);
    assert_eq!(result.summary, "Max steps (3) reached without completion");
    assert_eq!(result.steps_taken, 3);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(wait.calls().len(), 3);
    assert_eq!(orchestrator.memory().len(), 3);
}

#[tokio::test]
async fn test_need_user_input_reports_recorded_steps() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "wait", json!({"seconds": 1})),
        ChatResponse::text("NEED_USER_INPUT: which size?"),
    ]));
    let (mut orchestrator, _driver) = build(provider, vec![Arc::new(MockTool::ok("wait"))], 10);

    let result = orchestrator.execute_task("buy shoes").await;
    assert_eq!(result.status, AgentStatus::NeedUserInput);
    assert_eq!(result.summary, "which size?");
    assert_eq!(result.steps_taken, 1);
}

#[tokio::test]
async fn test_withheld_confirmation_cancels() {
    let response = ChatResponse::tool_use(
        None,
        vec![
            ToolCall::new("c1", "click", json!({"selector": "#buy-now-pay"})),
            ToolCall::new("c2", "wait", json!({"seconds": 1})),
        ],
    );
    let provider = Arc::new(ScriptedProvider::new(vec![response]));
    let click = Arc::new(MockTool::ok("click"));
    let wait = Arc::new(MockTool::ok("wait"));
    let (orchestrator, _driver) = build(provider.clone(), vec![click.clone(), wait.clone()], 10);
    let observer = Arc::new(RecordingObserver::default());
    let mut orchestrator = orchestrator.with_run_observer(observer.clone());

    let result = orchestrator.execute_task("buy it").await;

    assert_eq!(result.status, AgentStatus::Cancelled);
    assert_eq!(result.summary, "User cancelled action");
    assert!(click.calls().is_empty());
    assert!(wait.calls().is_empty());
    assert_eq!(provider.call_count(), 1);
    assert!(observer.events().iter().any(|e| e.starts_with("security:Click on element containing")));
}

#[tokio::test]
async fn test_granted_confirmation_runs_the_action() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "click", json!({"selector": "#checkout"})),
        ChatResponse::text("DONE: ordered"),
    ]));
    let click = Arc::new(MockTool::ok("click"));
    let approve = Arc::new(ApproveAll::new());
    let (orchestrator, _driver) = build(provider, vec![click.clone()], 10);
    let mut orchestrator = orchestrator.with_confirmation(approve.clone());

    let result = orchestrator.execute_task("order").await;

    assert_eq!(result.status, AgentStatus::Done);
    assert_eq!(click.calls(), vec![json!({"selector": "#checkout"})]);
    let requests = approve.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("Action: Click on element: #checkout\nRisk: destructive"));
}

#[tokio::test]
async fn test_failure_runs_corrective_tool() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "click", json!({"selector": "#gone"})),
        call("c2", "click", json!({"selector": "#gone"})),
        ChatResponse::text("FAILED: cannot find it"),
    ]));
    let click = Arc::new(MockTool::failing("click", "Element not found: #gone"));
    let wait = Arc::new(MockTool::ok("wait"));
    let scroll = Arc::new(MockTool::ok("scroll"));
    let (orchestrator, _driver) = build(provider.clone(), vec![click.clone(), wait.clone(), scroll.clone()], 10);
    let observer = Arc::new(RecordingObserver::default());
    let mut orchestrator = orchestrator.with_run_observer(observer.clone());

    let result = orchestrator.execute_task("click it").await;

    assert_eq!(result.status, AgentStatus::Failed);
    assert_eq!(result.summary, "cannot find it");
    assert_eq!(result.steps_taken, 2);
    assert_eq!(click.calls().len(), 2);
    assert_eq!(wait.calls(), vec![json!({"seconds": 2.0})]);
    assert_eq!(scroll.calls(), vec![json!({"amount": 500})]);

    let step = &orchestrator.memory().steps()[0];
    assert!(!step.success);
    assert!(step.result_summary.starts_with("Error: Tool execution failed: Element not"));

    let replies = tool_replies(&provider, 1);
    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.tool_call_id.as_deref(), Some("c1"));
    let payload: Value = serde_json::from_str(&reply.content.text()).unwrap();
    assert_eq!(payload["recovery_attempted"], "Wait for element to appear");
    assert!(payload["error"].as_str().unwrap().contains("Element not found"));

    let events = observer.events();
    assert!(events.contains(&"tool:1:click:false".to_string()));
    assert!(events.contains(&"recovery:wait".to_string()));
    assert!(events.contains(&"recovery:scroll".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("final:failed"));
}

#[tokio::test]
async fn test_retry_counts_are_cleared_between_tasks() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "click", json!({"selector": "#gone"})),
        ChatResponse::text("DONE: ok"),
        call("c2", "click", json!({"selector": "#gone"})),
        ChatResponse::text("DONE: ok"),
    ]));
    let click = Arc::new(MockTool::failing("click", "Element not found: #gone"));
    let wait = Arc::new(MockTool::ok("wait"));
    let (mut orchestrator, _driver) = build(provider, vec![click, wait.clone()], 10);

    orchestrator.execute_task("first").await;
    orchestrator.execute_task("second").await;

    // Counters are cleared per task, so both first failures wait.
    assert_eq!(wait.calls(), vec![json!({"seconds": 2.0}), json!({"seconds": 2.0})]);
}

#[tokio::test]
async fn test_unknown_tool_is_a_failed_step() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "teleport", json!({"to": "moon"})),
        ChatResponse::text("DONE: gave up on teleporting"),
    ]));
    let (mut orchestrator, _driver) = build(provider.clone(), vec![], 10);

    let result = orchestrator.execute_task("go").await;

    assert_eq!(result.steps_taken, 1);
    let step = &orchestrator.memory().steps()[0];
    assert!(!step.success);
    assert_eq!(step.result_summary, "Error: Unknown tool: teleport");
    assert!(tool_replies(&provider, 1)[0].content.text().contains("Unknown tool: teleport"));
}

#[tokio::test]
async fn test_tool_calls_run_in_order() {
    let response = ChatResponse::tool_use(
        Some("typing then submitting".to_string()),
        vec![
            ToolCall::new("c1", "type_text", json!({"selector": "#q", "text": "milk"})),
            ToolCall::new("c2", "press", json!({"keys": "Enter"})),
        ],
    );
    let provider = Arc::new(ScriptedProvider::new(vec![response, ChatResponse::text("DONE: searched")]));
    let (mut orchestrator, _driver) = build(
        provider.clone(),
        vec![Arc::new(MockTool::ok("type_text")), Arc::new(MockTool::ok("press"))],
        10,
    );

    orchestrator.execute_task("search milk").await;

    let actions: Vec<String> = orchestrator.memory().steps().iter().map(|s| s.tool_name.clone()).collect();
    assert_eq!(actions, vec!["type_text", "press"]);

    let second = provider.requests()[1].messages.clone();
    let assistant = second.iter().find(|m| m.role == MessageRole::Assistant).unwrap();
    assert_eq!(assistant.tool_calls.len(), 2);
    let replies: Vec<&str> = second
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(replies, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_stop_signal_cancels_before_next_call() {
    let stop = Arc::new(StopTool {
        definition: ToolDefinition::new("stop_now", "Stops the run"),
    });
    let provider = Arc::new(ScriptedProvider::repeating(call("c1", "stop_now", json!({}))));
    let (mut orchestrator, _driver) = build(provider.clone(), vec![stop], 10);

    let result = orchestrator.execute_task("run").await;

    assert_eq!(result.status, AgentStatus::Cancelled);
    assert_eq!(result.summary, "Stopped by user");
    assert_eq!(result.steps_taken, 1);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_abort_before_start_is_cleared() {
    let provider = Arc::new(ScriptedProvider::new(vec![ChatResponse::text("DONE: ok")]));
    let (orchestrator, _driver) = build(provider, vec![], 10);
    let signal = Arc::new(AbortSignal::new());
    let mut orchestrator = orchestrator.with_abort_signal(signal.clone());

    orchestrator.stop();
    assert!(signal.is_aborted());
    let result = orchestrator.execute_task("go").await;
    assert_eq!(result.status, AgentStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn test_provider_error_is_retried() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![ChatResponse::text("DONE: second time lucky")])
            .fail_first(ProviderError::Network("connection reset".to_string())),
    );
    let (mut orchestrator, _driver) = build(provider.clone(), vec![], 10);

    let result = orchestrator.execute_task("go").await;

    assert_eq!(result.status, AgentStatus::Done);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_provider_error_on_last_iteration_fails() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![ChatResponse::text("DONE: unreachable")])
            .fail_first(ProviderError::Network("connection reset".to_string())),
    );
    let (mut orchestrator, _driver) = build(provider, vec![], 1);

    let result = orchestrator.execute_task("go").await;

    assert_eq!(result.status, AgentStatus::Failed);
    assert!(result.summary.starts_with("Error: "));
    assert!(result.summary.contains("connection reset"));
    assert_eq!(result.steps_taken, 1);
}

#[tokio::test]
async fn test_token_usage_accumulates() {
    let mut first = call("c1", "wait", json!({"seconds": 1}));
    first.usage = Usage::new(100, 10);
    let mut second = ChatResponse::text("DONE: ok");
    second.usage = Usage::new(120, 5);
    let provider = Arc::new(ScriptedProvider::new(vec![first, second]));
    let (mut orchestrator, _driver) = build(provider, vec![Arc::new(MockTool::ok("wait"))], 10);

    orchestrator.execute_task("go").await;
    assert_eq!(orchestrator.memory().total_tokens_used(), 235);
}

#[tokio::test]
async fn test_screenshots_go_to_run_dir() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![ChatResponse::text("DONE: ok")]));
    let driver = Arc::new(MockDriver::default());
    let config = OrchestratorConfig {
        run_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(config, provider, driver.clone(), ToolRegistry::new());

    orchestrator.execute_task("look").await;

    assert_eq!(driver.count_calls("screenshot"), 1);
    let expected = format!("screenshot:{}", dir.path().join("screenshots").join("step_0001.png").display());
    assert_eq!(driver.count_calls(&expected), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_result_from_real_catalog_is_a_failure() {
    let driver = Arc::new(MockDriver::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        call("c1", "click", json!({"selector": ""})),
        ChatResponse::text("DONE: ok"),
    ]));
    let registry = ToolRegistry::from_tools(browser_tools(driver.clone(), BrowserToolOptions::default())).unwrap();
    let mut orchestrator = Orchestrator::new(config(10), provider.clone(), driver.clone(), registry);

    orchestrator.execute_task("click nothing").await;

    let step = &orchestrator.memory().steps()[0];
    assert!(!step.success);
    assert!(step.result_summary.starts_with("Error: Empty selector provided"));
    assert_eq!(driver.count_calls("click"), 0);
    let payload: Value = serde_json::from_str(&tool_replies(&provider, 1)[0].content.text()).unwrap();
    assert_eq!(payload["recovery_attempted"], "Wait and retry");
}

#[tokio::test]
async fn test_page_url_feeds_risk_classification() {
    let driver = Arc::new(MockDriver::with_url("https://shop.example/checkout"));
    let provider = Arc::new(ScriptedProvider::new(vec![call("c1", "press", json!({"keys": "Enter"}))]));
    let press = Arc::new(MockTool::ok("press"));
    let registry = ToolRegistry::from_tools(vec![press.clone() as Arc<dyn Tool>]).unwrap();
    let mut orchestrator = Orchestrator::new(config(10), provider, driver, registry);

    let result = orchestrator.execute_task("pay").await;

    assert_eq!(result.status, AgentStatus::Cancelled);
    assert_eq!(result.final_url, "https://shop.example/checkout");
    assert!(press.calls().is_empty());
}

#[tokio::test]
async fn test_risk_uses_url_left_by_earlier_call() {
    let driver = Arc::new(MockDriver::with_url("https://search.example/"));
    let response = ChatResponse::tool_use(
        None,
        vec![
            ToolCall::new("c1", "navigate_to_url", json!({"url": "https://shop.example/checkout"})),
            ToolCall::new("c2", "press", json!({"keys": "Enter"})),
        ],
    );
    let provider = Arc::new(ScriptedProvider::new(vec![response, ChatResponse::text("DONE: paid")]));
    let registry = ToolRegistry::from_tools(browser_tools(driver.clone(), BrowserToolOptions::default())).unwrap();
    let mut orchestrator = Orchestrator::new(config(10), provider, driver.clone(), registry);

    let result = orchestrator.execute_task("pay").await;

    assert_eq!(result.status, AgentStatus::Cancelled);
    assert_eq!(driver.count_calls("navigate:https://shop.example/checkout"), 1);
    assert_eq!(driver.count_calls("press"), 0);
}

/// Click that fails or succeeds following a fixed script.
struct FlakyClick {
    definition: ToolDefinition,
    outcomes: Mutex<VecDeque<bool>>,
}

impl FlakyClick {
    fn new(outcomes: &[bool]) -> Self {
        Self {
            definition: ToolDefinition::new("click", "Flaky click"),
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl Tool for FlakyClick {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        match self.outcomes.lock().unwrap().pop_front() {
            Some(false) => Err(ToolError::ExecutionFailed("Element not found: #next".to_string())),
            _ => Ok(ToolResult::success("clicked")),
        }
    }
}

#[tokio::test]
async fn test_success_resets_retry_count_within_task() {
    let click_next = || call("c", "click", json!({"selector": "#next"}));
    let provider = Arc::new(ScriptedProvider::new(vec![
        click_next(),
        click_next(),
        click_next(),
        ChatResponse::text("DONE: ok"),
    ]));
    let click = Arc::new(FlakyClick::new(&[false, true, false]));
    let wait = Arc::new(MockTool::ok("wait"));
    let scroll = Arc::new(MockTool::ok("scroll"));
    let (mut orchestrator, _driver) = build(provider, vec![click, wait.clone(), scroll.clone()], 10);

    orchestrator.execute_task("page through").await;

    let outcomes: Vec<bool> = orchestrator.memory().steps().iter().map(|s| s.success).collect();
    assert_eq!(outcomes, vec![false, true, false]);
    // The failure after a success starts over at the first rung.
    assert_eq!(wait.calls(), vec![json!({"seconds": 2.0}), json!({"seconds": 2.0})]);
    assert!(scroll.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_observation_failure_fails_the_iteration() {
    let provider = Arc::new(ScriptedProvider::repeating(ChatResponse::text("DONE: ok")));
    let (mut orchestrator, driver) = build(provider.clone(), vec![], 2);
    driver.disconnect();

    let result = orchestrator.execute_task("look around").await;

    assert_eq!(result.status, AgentStatus::Failed);
    assert_eq!(result.summary, "Error: Browser error: Browser not connected");
    assert_eq!(provider.call_count(), 0);
}
