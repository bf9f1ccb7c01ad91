//! Interaction loop: observe, ask the model, act, recover.
//!
//! One [`Orchestrator`] drives one browser session. Tasks run to completion
//! one at a time; tool calls from a single model turn run sequentially in
//! the order the model gave them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use webpilot_protocols::{
    AbortSignal, AgentError, BrowserDriver, ChatRequest, ChatResponse, LLMProvider, Message,
    ToolCall, ToolContext, ToolOutcome, ToolResult,
};

use crate::hooks::{ConfirmationHandler, DenyAll, RunObserver, SilentObserver};
use crate::memory::{AgentMemory, truncate_chars};
use crate::observation::Observer;
use crate::prompts::{
    DONE_MARKER, FAILED_MARKER, NEED_USER_INPUT_MARKER, SYSTEM_PROMPT, continuation_prompt,
    task_prompt,
};
use crate::recovery::{ErrorContext, RecoveryAction, RecoveryPolicy};
use crate::registry::ToolRegistry;
use crate::risk::{RiskClassifier, format_confirmation_request};

/// Visible text sampled for risk classification.
const RISK_TEXT_SAMPLE: usize = 500;
/// Longest error text handed back to the model.
const MAX_ERROR_LENGTH: usize = 500;
/// Pause after a failed iteration before the next one.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// State of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Done,
    NeedUserInput,
    Failed,
    Cancelled,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::NeedUserInput => "need_user_input",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub status: AgentStatus,
    pub summary: String,
    pub steps_taken: usize,
    pub final_url: String,
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Iteration budget per task.
    pub max_steps: u32,
    /// Budget of the generic wait-and-retry recovery.
    pub max_retries: u32,
    pub max_history_steps: usize,
    pub max_observation_length: usize,
    pub max_tokens: Option<u32>,
    /// Run directory. Screenshots land in its `screenshots/` child.
    pub run_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_retries: 3,
            max_history_steps: 10,
            max_observation_length: 2000,
            max_tokens: None,
            run_dir: None,
        }
    }
}

/// Terminal status and payload if `content` carries a marker.
///
/// Markers match case-insensitively; the payload is the trimmed text after
/// the first occurrence.
pub fn parse_terminal_marker(content: &str) -> Option<(AgentStatus, String)> {
    let upper = content.to_ascii_uppercase();
    [
        (DONE_MARKER, AgentStatus::Done),
        (NEED_USER_INPUT_MARKER, AgentStatus::NeedUserInput),
        (FAILED_MARKER, AgentStatus::Failed),
    ]
    .into_iter()
    .find_map(|(marker, status)| {
        upper
            .find(marker)
            .map(|at| (status, content[at + marker.len()..].trim().to_string()))
    })
}

/// What happened to one tool call.
enum CallOutcome {
    Completed(ToolOutcome),
    /// Confirmation was withheld; the task must stop.
    Blocked,
}

/// Drives tasks against one browser session.
pub struct Orchestrator {
    config: OrchestratorConfig,
    provider: Arc<dyn LLMProvider>,
    driver: Arc<dyn BrowserDriver>,
    registry: ToolRegistry,
    observer: Observer,
    risk: RiskClassifier,
    recovery: RecoveryPolicy,
    confirmation: Arc<dyn ConfirmationHandler>,
    run_observer: Arc<dyn RunObserver>,
    abort_signal: Arc<AbortSignal>,
    memory: AgentMemory,
    messages: Vec<Message>,
    run_id: String,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        provider: Arc<dyn LLMProvider>,
        driver: Arc<dyn BrowserDriver>,
        registry: ToolRegistry,
    ) -> Self {
        let mut observer = Observer::new(driver.clone(), config.max_observation_length);
        if let Some(run_dir) = &config.run_dir {
            observer = observer.with_screenshots_dir(run_dir.join("screenshots"));
        }
        Self {
            recovery: RecoveryPolicy::new(config.max_retries),
            memory: AgentMemory::new("", config.max_history_steps),
            config,
            provider,
            driver,
            registry,
            observer,
            risk: RiskClassifier::new(),
            confirmation: Arc::new(DenyAll),
            run_observer: Arc::new(SilentObserver),
            abort_signal: Arc::new(AbortSignal::new()),
            messages: Vec::new(),
            run_id: String::new(),
        }
    }

    pub fn with_confirmation(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.confirmation = handler;
        self
    }

    pub fn with_run_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.run_observer = observer;
        self
    }

    pub fn with_risk_classifier(mut self, risk: RiskClassifier) -> Self {
        self.risk = risk;
        self
    }

    /// Share a stop flag with the caller.
    pub fn with_abort_signal(mut self, signal: Arc<AbortSignal>) -> Self {
        self.abort_signal = signal;
        self
    }

    pub fn abort_signal(&self) -> Arc<AbortSignal> {
        self.abort_signal.clone()
    }

    /// Ask the running task to stop at the next iteration.
    pub fn stop(&self) {
        self.abort_signal.abort();
    }

    /// Memory of the current or last task.
    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Run `task` until a terminal status or the step budget.
    pub async fn execute_task(&mut self, task: &str) -> ExecutionResult {
        self.memory = AgentMemory::new(task, self.config.max_history_steps);
        self.messages.clear();
        self.recovery.reset();
        self.abort_signal.reset();
        self.run_id = Uuid::new_v4().to_string();

        info!(run_id = %self.run_id, "Starting task: {}", task);
        self.run_observer.on_task_start(task).await;
        self.run_observer
            .on_thought(&format!("Starting task: {}", task))
            .await;

        let max_steps = self.config.max_steps;
        let mut iteration = 0;

        while iteration < max_steps {
            if self.abort_signal.is_aborted() {
                info!("Task stopped by user");
                return self
                    .finish(AgentStatus::Cancelled, "Stopped by user".to_string(), self.memory.len())
                    .await;
            }

            iteration += 1;
            debug!("Iteration {}/{}", iteration, max_steps);

            match self.run_iteration(task).await {
                Ok(Some((status, summary))) => {
                    let steps = self.memory.len();
                    return self.finish(status, summary, steps).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Step {} error: {}", iteration, e);
                    self.run_observer
                        .on_error(&format!("Step {} error: {}", iteration, e))
                        .await;
                    if iteration >= max_steps {
                        return self
                            .finish(AgentStatus::Failed, format!("Error: {}", e), iteration as usize)
                            .await;
                    }
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }

        warn!("Step budget of {} exhausted", max_steps);
        self.finish(
            AgentStatus::Failed,
            format!("Max steps ({}) reached without completion", max_steps),
            max_steps as usize,
        )
        .await
    }

    /// One observe, decide, act round. `Some` ends the task.
    async fn run_iteration(&mut self, task: &str) -> Result<Option<(AgentStatus, String)>, AgentError> {
        let observation = self.observer.observe(true).await?;
        let observation_text = observation.to_prompt_text();

        let prompt = if self.messages.is_empty() {
            task_prompt(task, &observation_text, &self.memory.history_summary())
        } else {
            continuation_prompt(&observation_text)
        };
        self.messages.push(Message::user(prompt));

        let response = self.provider.chat(self.build_request()).await?;
        if response.content.as_deref().is_some_and(|c| !c.is_empty()) || response.has_tool_calls() {
            self.messages
                .push(self.provider.format_assistant_message(&response));
        }
        self.memory
            .update_tokens(response.usage.input_tokens, response.usage.output_tokens);

        if let Some((status, summary)) = parse_terminal_marker(response.content_text()) {
            info!(%status, "Model ended the task: {}", summary);
            self.run_observer
                .on_thought(&format!("Task {}: {}", status, summary))
                .await;
            return Ok(Some((status, summary)));
        }

        self.process_tool_calls(&response, &observation.url).await
    }

    async fn process_tool_calls(
        &mut self,
        response: &ChatResponse,
        page_url: &str,
    ) -> Result<Option<(AgentStatus, String)>, AgentError> {
        let content = response.content_text();
        if !content.is_empty() && !response.has_tool_calls() {
            self.run_observer
                .on_thought(&truncate_chars(content, 200))
                .await;
        }

        let mut outcomes = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            match self.execute_tool(call, page_url).await {
                CallOutcome::Completed(outcome) => outcomes.push(outcome),
                CallOutcome::Blocked => {
                    return Ok(Some((AgentStatus::Cancelled, "User cancelled action".to_string())));
                }
            }
        }

        if !outcomes.is_empty() {
            let results = self.provider.format_tool_results(&outcomes);
            self.messages.extend(results);
        }
        Ok(None)
    }

    fn build_request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.messages.clone())
            .with_system(SYSTEM_PROMPT)
            .with_tools(self.registry.definitions());
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    /// Gate, run and record one call.
    async fn execute_tool(&mut self, call: &ToolCall, page_url: &str) -> CallOutcome {
        let page_text = self
            .driver
            .visible_text(RISK_TEXT_SAMPLE)
            .await
            .unwrap_or_default();
        // Earlier calls in the same turn may have navigated away.
        let current_url = match self.driver.current_url().await {
            Ok(url) => url,
            Err(_) => page_url.to_string(),
        };
        let classification = self
            .risk
            .classify(&call.name, &call.arguments, &current_url, &page_text);
        debug!(tool = %call.name, risk = %classification.risk, "{}", classification.reason);

        if classification.requires_confirmation {
            let request = format_confirmation_request(&call.name, &call.arguments, &classification);
            info!(tool = %call.name, risk = %classification.risk, "Confirmation required: {}", classification.reason);
            self.run_observer
                .on_security_check(&request, &classification.reason)
                .await;
            if !self.confirmation.confirm(&request).await {
                info!(tool = %call.name, "Action cancelled by user");
                self.run_observer.on_thought("Action cancelled by user").await;
                return CallOutcome::Blocked;
            }
        }

        let step = self.memory.len() + 1;
        let Some(tool) = self.registry.get(&call.name) else {
            let message = format!("Unknown tool: {}", call.name);
            warn!("{}", message);
            let payload = json!({"error": message});
            self.run_observer
                .on_tool_call(step, &call.name, &call.arguments, &payload, false)
                .await;
            self.memory.add_step(
                &call.name,
                &call.arguments,
                format!("Error: {}", truncate_chars(&message, 50)),
                false,
                "",
            );
            return CallOutcome::Completed(ToolOutcome::error(&call.id, payload.to_string()));
        };

        let action_key = RecoveryPolicy::action_key(&call.name, &call.arguments);
        let result = match tool.validate(&call.arguments) {
            Ok(()) => tool.execute(call.arguments.clone(), self.tool_context()).await,
            Err(e) => Err(e),
        };
        let result = match result {
            Ok(r) if r.success => Ok(r),
            Ok(r) => Err(r.message().to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(result) => {
                info!(tool = %call.name, success = true, "Tool call succeeded");
                self.run_observer
                    .on_tool_call(step, &call.name, &call.arguments, &result_payload(&result), true)
                    .await;
                let url = self.driver.current_url().await.unwrap_or_default();
                self.memory.add_step(
                    &call.name,
                    &call.arguments,
                    truncate_chars(&result.content, 100),
                    true,
                    url,
                );
                self.recovery.track_action(&action_key, true);
                CallOutcome::Completed(ToolOutcome::success(&call.id, result.content))
            }
            Err(message) => {
                let message = truncate_chars(&message, MAX_ERROR_LENGTH);
                warn!(tool = %call.name, success = false, "Tool call failed: {}", message);
                self.run_observer
                    .on_tool_call(step, &call.name, &call.arguments, &json!({"error": message}), false)
                    .await;

                let failures = self.recovery.track_action(&action_key, false);
                let recent = self
                    .memory
                    .recent_failures(3)
                    .into_iter()
                    .map(|s| s.action.clone())
                    .collect();
                let context = ErrorContext::new(&call.name, call.arguments.clone(), &message, failures - 1)
                    .with_recent_failures(recent);
                let action = self.recovery.decide(&context);
                info!(
                    strategy = %action.strategy,
                    retry = context.retry_count,
                    "Recovery: {}",
                    action.description
                );
                self.run_observer.on_recovery(&action).await;
                if !action.is_give_up() {
                    self.run_corrective(&action).await;
                }

                self.memory.add_step(
                    &call.name,
                    &call.arguments,
                    format!("Error: {}", truncate_chars(&message, 50)),
                    false,
                    "",
                );
                let payload = json!({"error": message, "recovery_attempted": action.description});
                CallOutcome::Completed(ToolOutcome::error(&call.id, payload.to_string()))
            }
        }
    }

    /// Best effort; a failing corrective tool is only logged.
    async fn run_corrective(&self, action: &RecoveryAction) {
        let (Some(name), Some(args)) = (&action.tool_name, &action.tool_args) else {
            return;
        };
        let Some(tool) = self.registry.get(name) else {
            debug!("Corrective tool {} is not registered", name);
            return;
        };
        match tool.execute(args.clone(), self.tool_context()).await {
            Ok(r) if r.success => debug!("Corrective {} done", name),
            Ok(r) => debug!("Corrective {} failed: {}", name, r.message()),
            Err(e) => debug!("Corrective {} failed: {}", name, e),
        }
    }

    fn tool_context(&self) -> ToolContext {
        let work_dir = self
            .config
            .run_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        ToolContext::new(&self.run_id, work_dir).with_abort_signal(self.abort_signal.clone())
    }

    async fn finish(&self, status: AgentStatus, summary: String, steps_taken: usize) -> ExecutionResult {
        let final_url = self.driver.current_url().await.unwrap_or_default();
        let result = ExecutionResult {
            status,
            summary,
            steps_taken,
            final_url,
        };
        info!(
            status = %result.status,
            steps = result.steps_taken,
            tokens = self.memory.total_tokens_used(),
            "Task finished: {}",
            result.summary
        );
        self.run_observer.on_final_report(&result).await;
        result
    }
}

/// Structured output when the tool produced one, else its text.
fn result_payload(result: &ToolResult) -> Value {
    result
        .structured_output
        .clone()
        .unwrap_or_else(|| Value::String(result.content.clone()))
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
