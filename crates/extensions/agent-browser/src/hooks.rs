//! Seams between the loop and its host: confirmation and progress reporting.

use async_trait::async_trait;
use serde_json::Value;

use crate::orchestrator::ExecutionResult;
use crate::recovery::RecoveryAction;

/// Asks a human whether a gated action may run.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// `request` is the rendered confirmation text. `false` cancels the task.
    async fn confirm(&self, request: &str) -> bool;
}

/// Refuses every gated action. Used when the host installs no handler.
pub struct DenyAll;

#[async_trait]
impl ConfirmationHandler for DenyAll {
    async fn confirm(&self, _request: &str) -> bool {
        false
    }
}

/// Receives progress events from the loop. Every method defaults to a no-op.
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn on_task_start(&self, _task: &str) {}

    async fn on_thought(&self, _thought: &str) {}

    async fn on_tool_call(
        &self,
        _step: usize,
        _tool: &str,
        _args: &Value,
        _result: &Value,
        _success: bool,
    ) {
    }

    async fn on_security_check(&self, _request: &str, _reason: &str) {}

    async fn on_recovery(&self, _action: &RecoveryAction) {}

    async fn on_error(&self, _message: &str) {}

    async fn on_final_report(&self, _result: &ExecutionResult) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl RunObserver for SilentObserver {}
