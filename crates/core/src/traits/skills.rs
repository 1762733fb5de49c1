//! Skills traits.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{ToolDefinition, ToolOutput};

/// Tool interface for atomic operations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of the tool.
    fn name(&self) -> &str;

    /// Get the human-readable description.
    fn description(&self) -> &str;

    /// Get the JSON Schema for parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<ToolOutput>;

    /// Definition advertised to models.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool registry for managing available tools.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Register a new tool.
    async fn register(&self, tool: Box<dyn Tool>) -> Result<()>;

    /// List all available tools.
    async fn list(&self) -> Result<Vec<ToolDefinition>>;

    /// Execute a tool by name with arguments.
    async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput>;
}
