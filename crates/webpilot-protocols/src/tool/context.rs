//! Tool execution context.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Context for tool execution.
#[derive(Clone)]
pub struct ToolContext {
    /// Identifier of the current run.
    pub run_id: String,

    /// Directory that tools may write artifacts (screenshots) into.
    pub work_dir: PathBuf,

    pub abort_signal: Arc<AbortSignal>,
}

impl ToolContext {
    pub fn new(run_id: impl Into<String>, work_dir: PathBuf) -> Self {
        Self {
            run_id: run_id.into(),
            work_dir,
            abort_signal: Arc::new(AbortSignal::new()),
        }
    }

    /// Share an existing abort signal with this context.
    pub fn with_abort_signal(mut self, signal: Arc<AbortSignal>) -> Self {
        self.abort_signal = signal;
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_signal.is_aborted()
    }
}

/// Cooperative cancellation flag, checked between steps.
#[derive(Debug, Default)]
pub struct AbortSignal {
    aborted: AtomicBool,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self {
            aborted: AtomicBool::new(false),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    /// Clear the flag so the next run starts fresh.
    pub fn reset(&self) {
        self.aborted.store(false, Ordering::Relaxed);
    }
}
