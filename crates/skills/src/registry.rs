//! Tool registry implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use xs_core::{
    traits::{Tool, ToolRegistry},
    types::{ToolDefinition, ToolOutput},
    Error, Result,
};

/// Default tool registry using DashMap.
pub struct DefaultToolRegistry {
    /// Registered tools.
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl DefaultToolRegistry {
    /// Create a new tool registry.
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Register a shared tool, possibly already held by another registry.
    pub fn register_shared(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "Registering tool");

        if self.tools.contains_key(&name) {
            return Err(Error::internal(format!(
                "Tool '{}' is already registered",
                name
            )));
        }

        self.tools.insert(name, tool);
        Ok(())
    }
}

impl Default for DefaultToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRegistry for DefaultToolRegistry {
    async fn register(&self, tool: Box<dyn Tool>) -> Result<()> {
        self.register_shared(Arc::from(tool))
    }

    async fn list(&self) -> Result<Vec<ToolDefinition>> {
        let mut definitions: Vec<_> = self.tools.iter().map(|entry| entry.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn execute(&self, name: &str, args: serde_json::Value) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::tool_not_found(name))?;

        tracing::debug!(tool = %name, "Executing tool");

        tool.execute(args).await
    }
}
