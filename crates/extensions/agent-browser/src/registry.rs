//! Tool registry owned by one orchestrator.

use std::sync::Arc;

use dashmap::DashMap;

use webpilot_protocols::{AgentError, Tool, ToolDefinition};

/// Tools available to the loop, addressed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a catalog; later duplicates are rejected.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self, AgentError> {
        let registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let name = tool.definition().name.clone();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| t.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions sorted by name, so requests are stable between calls.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .iter()
            .map(|t| t.definition().clone())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
