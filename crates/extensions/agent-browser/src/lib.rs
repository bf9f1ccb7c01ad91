//! Browser agent core for webpilot.
//!
//! The [`Orchestrator`] alternates page observation, a model call and tool
//! execution until the model reports a terminal marker or the step budget
//! runs out. Each tool call is gated by the [`RiskClassifier`] and failures
//! are routed through the [`RecoveryPolicy`].

pub mod hooks;
pub mod memory;
pub mod observation;
pub mod orchestrator;
pub mod prompts;
pub mod recovery;
pub mod registry;
pub mod risk;

#[cfg(test)]
mod test_support;

pub use hooks::{ConfirmationHandler, DenyAll, RunObserver, SilentObserver};
pub use memory::{AgentMemory, Step};
pub use observation::{Observation, Observer};
pub use orchestrator::{
    AgentStatus, ExecutionResult, Orchestrator, OrchestratorConfig, parse_terminal_marker,
};
pub use recovery::{ErrorContext, ErrorKind, RecoveryAction, RecoveryPolicy, RecoveryStrategy};
pub use registry::ToolRegistry;
pub use risk::{ActionClassification, RiskClassifier, RiskTier, format_confirmation_request};
