//! Per-run artifact directory and JSON-lines event log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use webpilot_agent::{ExecutionResult, RecoveryAction, RunObserver};

const LOG_FILE: &str = "logs.jsonl";
const SCREENSHOTS_DIR: &str = "screenshots";

/// Writes `runs/<YYYYmmdd_HHMMSS>/logs.jsonl` and mirrors events to tracing.
pub(crate) struct RunLogger {
    run_dir: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl RunLogger {
    /// Create a fresh run directory (with `screenshots/`) under `runs_dir`.
    pub async fn create(runs_dir: &Path) -> Result<Self> {
        let run_dir = runs_dir.join(Local::now().format("%Y%m%d_%H%M%S").to_string());
        tokio::fs::create_dir_all(run_dir.join(SCREENSHOTS_DIR))
            .await
            .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(LOG_FILE))
            .await
            .context("Failed to open run log")?;
        info!("Run directory: {}", run_dir.display());
        Ok(Self {
            run_dir,
            file: Mutex::new(file),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    async fn append(&self, mut entry: Value) {
        entry["timestamp"] = json!(Local::now().to_rfc3339());
        let mut line = entry.to_string();
        line.push('\n');
        let mut file = self.file.lock().await;
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to write run log: {}", e);
        }
    }
}

#[async_trait]
impl RunObserver for RunLogger {
    async fn on_task_start(&self, task: &str) {
        info!("Task: {}", task);
    }

    async fn on_thought(&self, thought: &str) {
        info!("Thought: {}", thought);
    }

    async fn on_tool_call(&self, step: usize, tool: &str, args: &Value, result: &Value, success: bool) {
        if success {
            info!(step, tool, "Tool call succeeded");
        } else {
            warn!(step, tool, result = %result, "Tool call failed");
        }
        self.append(json!({
            "step": step,
            "tool": tool,
            "args": args,
            "result": result,
            "success": success,
        }))
        .await;
    }

    async fn on_security_check(&self, request: &str, reason: &str) {
        warn!(reason, "Confirmation required:\n{}", request);
    }

    async fn on_recovery(&self, action: &RecoveryAction) {
        info!(strategy = %action.strategy, "Recovery: {}", action.description);
    }

    async fn on_error(&self, message: &str) {
        error!("{}", message);
        self.append(json!({"type": "error", "message": message})).await;
    }

    async fn on_final_report(&self, result: &ExecutionResult) {
        info!(
            status = %result.status,
            steps = result.steps_taken,
            url = %result.final_url,
            "Finished: {}",
            result.summary
        );
        self.append(json!({"type": "final_report", "report": result}))
            .await;
    }
}
