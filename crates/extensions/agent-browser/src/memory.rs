//! Per-task step log with a rolling summary and prompt-sized history.

use serde::Serialize;
use serde_json::Value;

/// One executed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub step_number: usize,
    /// Compact rendering such as `click(selector=#buy)`.
    pub action: String,
    pub tool_name: String,
    pub tool_args: Value,
    pub result_summary: String,
    pub success: bool,
    pub observation_summary: String,
}

/// Memory for a single task. Discarded when the task ends.
#[derive(Debug, Clone)]
pub struct AgentMemory {
    task: String,
    steps: Vec<Step>,
    state_summary: String,
    total_tokens_used: u64,
    max_history_steps: usize,
}

impl AgentMemory {
    /// `max_history_steps` is how many recent steps the history keeps verbatim.
    pub fn new(task: impl Into<String>, max_history_steps: usize) -> Self {
        Self {
            task: task.into(),
            steps: Vec::new(),
            state_summary: "Just started.".to_string(),
            total_tokens_used: 0,
            max_history_steps,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn add_step(
        &mut self,
        tool_name: &str,
        tool_args: &Value,
        result_summary: impl Into<String>,
        success: bool,
        observation_summary: impl Into<String>,
    ) {
        self.steps.push(Step {
            step_number: self.steps.len() + 1,
            action: format!("{}({})", tool_name, format_args(tool_args)),
            tool_name: tool_name.to_string(),
            tool_args: tool_args.clone(),
            result_summary: result_summary.into(),
            success,
            observation_summary: observation_summary.into(),
        });
        self.state_summary = self.compute_state_summary();
    }

    /// Older steps collapsed to one line, recent ones verbatim.
    pub fn history_summary(&self) -> String {
        if self.steps.is_empty() {
            return "No previous actions.".to_string();
        }

        let keep = self.max_history_steps.min(self.steps.len());
        let (older, recent) = self.steps.split_at(self.steps.len() - keep);
        let mut lines = Vec::with_capacity(recent.len() + 1);

        if !older.is_empty() {
            let mut actions: Vec<&str> = Vec::new();
            for step in older {
                if !actions.contains(&step.action.as_str()) {
                    actions.push(&step.action);
                }
            }
            lines.push(format!("Earlier: {} steps ({})", older.len(), actions.join(", ")));
        }

        for step in recent {
            lines.push(format!(
                "Step {}: {} -> {}",
                step.step_number, step.action, step.result_summary
            ));
        }
        lines.join("\n")
    }

    /// The last `n` failed steps, oldest first.
    pub fn recent_failures(&self, n: usize) -> Vec<&Step> {
        let failures: Vec<&Step> = self.steps.iter().filter(|s| !s.success).collect();
        let skip = failures.len().saturating_sub(n);
        failures.into_iter().skip(skip).collect()
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn update_tokens(&mut self, input_tokens: u32, output_tokens: u32) {
        self.total_tokens_used += u64::from(input_tokens) + u64::from(output_tokens);
    }

    pub fn total_tokens_used(&self) -> u64 {
        self.total_tokens_used
    }

    pub fn state_summary(&self) -> &str {
        &self.state_summary
    }

    fn compute_state_summary(&self) -> String {
        let Some(last) = self.steps.last() else {
            return "Just started.".to_string();
        };

        let successful = self.steps.iter().filter(|s| s.success).count();
        let mut parts = vec![
            format!("Steps: {} ({} successful)", self.steps.len(), successful),
            format!("Last: {} -> {}", last.action, last.result_summary),
        ];
        if !last.observation_summary.is_empty() {
            parts.push(format!(
                "Current page: {}",
                truncate_chars(&last.observation_summary, 100)
            ));
        }
        parts.join(" | ")
    }
}

/// `k=v, ...` with long values and the whole list shortened.
fn format_args(args: &Value) -> String {
    let Some(map) = args.as_object() else {
        return String::new();
    };
    let parts: Vec<String> = map
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", k, shorten(&value, 30))
        })
        .collect();
    shorten(&parts.join(", "), 50)
}

/// Beyond `max` characters, keep `max - 3` and append `...`.
fn shorten(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", truncate_chars(value, max - 3))
    } else {
        value.to_string()
    }
}

pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_with(n: usize, max_history: usize) -> AgentMemory {
        let mut memory = AgentMemory::new("find milk", max_history);
        for i in 0..n {
            let tool = if i % 2 == 0 { "wait" } else { "scroll" };
            memory.add_step(tool, &json!({}), format!("ok {}", i + 1), true, "");
        }
        memory
    }

    #[test]
    fn test_new_memory() {
        let memory = AgentMemory::new("find milk", 10);
        assert_eq!(memory.task(), "find milk");
        assert!(memory.is_empty());
        assert_eq!(memory.state_summary(), "Just started.");
        assert_eq!(memory.history_summary(), "No previous actions.");
        assert!(memory.last_step().is_none());
    }

    #[test]
    fn test_add_step_numbers_and_action() {
        let mut memory = AgentMemory::new("t", 10);
        memory.add_step("click", &json!({"selector": "#buy"}), "clicked", true, "https://a.b/");
        memory.add_step("press", &json!({"keys": "Enter"}), "Error: boom", false, "");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.steps()[0].step_number, 1);
        assert_eq!(memory.steps()[0].action, "click(selector=#buy)");
        assert_eq!(memory.last_step().unwrap().step_number, 2);
    }

    #[test]
    fn test_state_summary_is_recomputed() {
        let mut memory = AgentMemory::new("t", 10);
        memory.add_step("navigate_to_url", &json!({"url": "https://a.b"}), "ok", true, "https://a.b/");
        assert_eq!(
            memory.state_summary(),
            "Steps: 1 (1 successful) | Last: navigate_to_url(url=https://a.b) -> ok | Current page: https://a.b/"
        );

        memory.add_step("click", &json!({"selector": "#x"}), "Error: gone", false, "");
        assert_eq!(
            memory.state_summary(),
            "Steps: 2 (1 successful) | Last: click(selector=#x) -> Error: gone"
        );
    }

    #[test]
    fn test_long_arguments_are_shortened() {
        let mut memory = AgentMemory::new("t", 10);
        let long = "x".repeat(40);
        memory.add_step("type_text", &json!({"text": long}), "ok", true, "");
        assert_eq!(memory.steps()[0].action, format!("type_text(text={}...)", "x".repeat(27)));

        memory.add_step("type_text", &json!({"selector": "y".repeat(30), "text": "z".repeat(30)}), "ok", true, "");
        let action = &memory.steps()[1].action;
        assert_eq!(action.chars().count(), "type_text()".len() + 50);
        assert!(action.ends_with("...)"));
    }

    #[test]
    fn test_history_keeps_recent_verbatim() {
        let memory = memory_with(3, 5);
        assert_eq!(
            memory.history_summary(),
            "Step 1: wait() -> ok 1\nStep 2: scroll() -> ok 2\nStep 3: wait() -> ok 3"
        );
    }

    #[test]
    fn test_history_compresses_older_steps() {
        let memory = memory_with(6, 2);
        let summary = memory.history_summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Earlier: 4 steps (wait(), scroll())");
        assert_eq!(lines[1], "Step 5: wait() -> ok 5");
        assert_eq!(lines[2], "Step 6: scroll() -> ok 6");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_recent_failures() {
        let mut memory = AgentMemory::new("t", 10);
        for i in 0..5 {
            memory.add_step("click", &json!({"selector": format!("#{}", i)}), "Error", false, "");
            memory.add_step("wait", &json!({}), "ok", true, "");
        }
        let failures = memory.recent_failures(3);
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].action, "click(selector=#2)");
        assert_eq!(failures[2].action, "click(selector=#4)");
        assert_eq!(memory.recent_failures(10).len(), 5);
    }

    #[test]
    fn test_update_tokens() {
        let mut memory = AgentMemory::new("t", 10);
        memory.update_tokens(100, 20);
        memory.update_tokens(50, 5);
        assert_eq!(memory.total_tokens_used(), 175);
    }
}
