//! Recovery policy for failed tool calls.
//!
//! [`RecoveryPolicy::decide`] is a pure function of the [`ErrorContext`]; the
//! only state the policy keeps is the per-action retry counter map.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::risk::arg_str;

/// Corrective strategy chosen for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Retry,
    /// Re-query with a different intent or pick another candidate.
    Alternative,
    Scroll,
    Wait,
    ClosePopup,
    GoBack,
    GiveUp,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retry => "retry",
            Self::Alternative => "alternative",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
            Self::ClosePopup => "close_popup",
            Self::GoBack => "go_back",
            Self::GiveUp => "give_up",
        };
        f.write_str(s)
    }
}

/// Failure family, derived from the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Obscured,
    Navigation,
    Unclassified,
}

const NOT_FOUND_MARKERS: &[&str] = &["not found", "no element", "timeout", "waiting for selector"];
const OBSCURED_MARKERS: &[&str] = &["not visible", "intercepted", "obscured", "covered"];
const NAVIGATION_MARKERS: &[&str] = &["navigation", "net::", "err_"];

impl ErrorKind {
    /// Classify by substring on the lower-cased message, in family order.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        let has_any = |markers: &[&str]| markers.iter().any(|m| message.contains(m));
        if has_any(NOT_FOUND_MARKERS) {
            Self::NotFound
        } else if has_any(OBSCURED_MARKERS) {
            Self::Obscured
        } else if has_any(NAVIGATION_MARKERS) {
            Self::Navigation
        } else {
            Self::Unclassified
        }
    }
}

/// Everything known about a failure when a decision is made.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub kind: ErrorKind,
    pub message: String,
    pub tool_name: String,
    pub tool_args: Value,
    /// Earlier failures of the same action key in this task.
    pub retry_count: u32,
    /// Actions of the most recent failed steps, oldest first.
    pub recent_failures: Vec<String>,
}

impl ErrorContext {
    pub fn new(
        tool_name: impl Into<String>,
        tool_args: Value,
        message: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::classify(&message),
            message,
            tool_name: tool_name.into(),
            tool_args,
            retry_count,
            recent_failures: Vec::new(),
        }
    }

    pub fn with_recent_failures(mut self, failures: Vec<String>) -> Self {
        self.recent_failures = failures;
        self
    }
}

/// The policy's decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryAction {
    pub strategy: RecoveryStrategy,
    pub description: String,
    /// Corrective tool to run before the next attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<Value>,
}

impl RecoveryAction {
    fn advice(strategy: RecoveryStrategy, description: impl Into<String>) -> Self {
        Self {
            strategy,
            description: description.into(),
            tool_name: None,
            tool_args: None,
        }
    }

    fn corrective(
        strategy: RecoveryStrategy,
        description: &str,
        tool_name: &str,
        tool_args: Value,
    ) -> Self {
        Self {
            strategy,
            description: description.to_string(),
            tool_name: Some(tool_name.to_string()),
            tool_args: Some(tool_args),
        }
    }

    fn wait(description: &str, seconds: f64) -> Self {
        Self::corrective(RecoveryStrategy::Wait, description, "wait", json!({"seconds": seconds}))
    }

    fn scroll(description: &str, amount: i64) -> Self {
        Self::corrective(RecoveryStrategy::Scroll, description, "scroll", json!({"amount": amount}))
    }

    pub fn is_give_up(&self) -> bool {
        self.strategy == RecoveryStrategy::GiveUp
    }
}

/// Maps failures to corrective actions and counts retries per action key.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    max_retries: u32,
    retry_counts: HashMap<String, u32>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RecoveryPolicy {
    /// `max_retries` bounds the generic wait-and-retry branch.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_counts: HashMap::new(),
        }
    }

    pub fn decide(&self, context: &ErrorContext) -> RecoveryAction {
        let retry = context.retry_count;
        match context.kind {
            ErrorKind::NotFound => match retry {
                0 => RecoveryAction::wait("Wait for element to appear", 2.0),
                1 => RecoveryAction::scroll("Scroll down to find element", 500),
                2 => RecoveryAction::scroll("Scroll up to find element", -500),
                _ => RecoveryAction::advice(
                    RecoveryStrategy::Alternative,
                    "Element not found - try query_dom with different query",
                ),
            },
            ErrorKind::Obscured => match retry {
                0 => RecoveryAction::corrective(
                    RecoveryStrategy::ClosePopup,
                    "Close popups that may be blocking",
                    "close_popups",
                    json!({}),
                ),
                1 => RecoveryAction::scroll("Scroll to better position element", -200),
                2 => RecoveryAction::wait("Wait for animations/overlays", 1.5),
                _ => RecoveryAction::advice(
                    RecoveryStrategy::Alternative,
                    "Element obscured - try alternative selector",
                ),
            },
            ErrorKind::Navigation if retry < 2 => {
                RecoveryAction::wait("Wait and retry navigation", 3.0)
            }
            ErrorKind::Navigation => {
                RecoveryAction::advice(RecoveryStrategy::GiveUp, "Navigation failed - network issue")
            }
            ErrorKind::Unclassified if retry < self.max_retries => {
                RecoveryAction::wait("Wait and retry", 2.0)
            }
            ErrorKind::Unclassified => RecoveryAction::advice(
                RecoveryStrategy::GiveUp,
                format!("Failed after {} attempts: {}", retry, context.message),
            ),
        }
    }

    /// Record an attempt of `key`; returns its consecutive failure count.
    ///
    /// Success clears the key and returns 0.
    pub fn track_action(&mut self, key: &str, success: bool) -> u32 {
        if success {
            self.retry_counts.remove(key);
            return 0;
        }
        let count = self.retry_counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn reset(&mut self) {
        self.retry_counts.clear();
    }

    /// Normalised identity of a call: tool name plus its primary argument.
    pub fn action_key(tool_name: &str, args: &Value) -> String {
        match tool_name {
            "click" => format!("click:{}", arg_str(args, "selector")),
            "type_text" => format!("type:{}", arg_str(args, "selector")),
            "navigate_to_url" => format!("nav:{}", arg_str(args, "url")),
            _ => format!("{}:{}", tool_name, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(message: &str, retry: u32) -> RecoveryAction {
        RecoveryPolicy::default().decide(&ErrorContext::new("click", json!({"selector": "#a"}), message, retry))
    }

    #[test]
    fn test_classify_families() {
        assert_eq!(ErrorKind::classify("Element not found: #a"), ErrorKind::NotFound);
        assert_eq!(ErrorKind::classify("Timeout waiting for selector: #a"), ErrorKind::NotFound);
        assert_eq!(ErrorKind::classify("Element not visible: #a"), ErrorKind::Obscured);
        assert_eq!(ErrorKind::classify("click intercepted by <div>"), ErrorKind::Obscured);
        assert_eq!(ErrorKind::classify("Navigation failed: net::ERR_NAME_NOT_RESOLVED"), ErrorKind::Navigation);
        assert_eq!(ErrorKind::classify("something odd"), ErrorKind::Unclassified);
    }

    #[test]
    fn test_not_found_sequence() {
        let first = decide("Element not found: #a", 0);
        assert_eq!(first.strategy, RecoveryStrategy::Wait);
        assert_eq!(first.tool_name.as_deref(), Some("wait"));
        assert_eq!(first.tool_args, Some(json!({"seconds": 2.0})));

        let second = decide("Element not found: #a", 1);
        assert_eq!(second.strategy, RecoveryStrategy::Scroll);
        assert_eq!(second.tool_args, Some(json!({"amount": 500})));

        let third = decide("Element not found: #a", 2);
        assert_eq!(third.strategy, RecoveryStrategy::Scroll);
        assert_eq!(third.tool_args, Some(json!({"amount": -500})));

        let fourth = decide("Element not found: #a", 3);
        assert_eq!(fourth.strategy, RecoveryStrategy::Alternative);
        assert!(fourth.tool_name.is_none());
    }

    #[test]
    fn test_decide_is_deterministic() {
        assert_eq!(decide("no element matches", 1), decide("no element matches", 1));
    }

    #[test]
    fn test_obscured_sequence() {
        let strategies: Vec<_> = (0..4).map(|n| decide("Element not visible: #a", n).strategy).collect();
        assert_eq!(
            strategies,
            vec![
                RecoveryStrategy::ClosePopup,
                RecoveryStrategy::Scroll,
                RecoveryStrategy::Wait,
                RecoveryStrategy::Alternative
            ]
        );
        assert_eq!(decide("covered by overlay", 0).tool_name.as_deref(), Some("close_popups"));
        assert_eq!(decide("covered by overlay", 2).tool_args, Some(json!({"seconds": 1.5})));
    }

    #[test]
    fn test_navigation_gives_up_after_two() {
        let msg = "Navigation failed: https://x (net::ERR_CONNECTION_REFUSED)";
        assert_eq!(decide(msg, 0).tool_args, Some(json!({"seconds": 3.0})));
        assert_eq!(decide(msg, 1).strategy, RecoveryStrategy::Wait);
        let last = decide(msg, 2);
        assert!(last.is_give_up());
        assert!(last.tool_name.is_none());
    }

    #[test]
    fn test_unclassified_uses_retry_budget() {
        let policy = RecoveryPolicy::new(2);
        let ctx = |n| ErrorContext::new("press", json!({"keys": "Enter"}), "boom", n);
        assert_eq!(policy.decide(&ctx(1)).strategy, RecoveryStrategy::Wait);
        let action = policy.decide(&ctx(2));
        assert!(action.is_give_up());
        assert_eq!(action.description, "Failed after 2 attempts: boom");
    }

    #[test]
    fn test_retry_count_lifecycle() {
        let mut policy = RecoveryPolicy::default();
        assert_eq!(policy.track_action("click:#a", false), 1);
        assert_eq!(policy.track_action("click:#a", false), 2);
        assert_eq!(policy.track_action("click:#a", false), 3);
        assert_eq!(policy.track_action("click:#a", true), 0);
        assert_eq!(policy.track_action("click:#a", false), 1);
    }

    #[test]
    fn test_counters_are_per_key_and_reset() {
        let mut policy = RecoveryPolicy::default();
        policy.track_action("click:#a", false);
        assert_eq!(policy.track_action("click:#b", false), 1);
        policy.reset();
        assert_eq!(policy.track_action("click:#a", false), 1);
    }

    #[test]
    fn test_action_key() {
        assert_eq!(RecoveryPolicy::action_key("click", &json!({"selector": "#buy"})), "click:#buy");
        assert_eq!(RecoveryPolicy::action_key("type_text", &json!({"selector": "#q", "text": "x"})), "type:#q");
        assert_eq!(
            RecoveryPolicy::action_key("navigate_to_url", &json!({"url": "https://a.b"})),
            "nav:https://a.b"
        );
        assert_eq!(RecoveryPolicy::action_key("press", &json!({"keys": "Enter"})), r#"press:{"keys":"Enter"}"#);
    }
}
