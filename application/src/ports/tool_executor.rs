//! Tool Executor port
//!
//! Defines the interface for executing named tools with raw JSON input.

use async_trait::async_trait;
use serde_json::Value;
use toolhost_domain::tool::{entities::ToolDefinition, value_objects::ToolResult};

/// Port for tool execution
///
/// Implementations validate input, enforce timeouts and never fail: every
/// problem is reported as a failed [`ToolResult`].
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Definitions of all registered tools, sorted by name
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Get the definition of a specific tool
    fn definition(&self, name: &str) -> Option<ToolDefinition> {
        self.definitions().into_iter().find(|d| d.name == name)
    }

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.definition(name).is_some()
    }

    /// Function-calling definitions for the tools `filter` accepts
    fn api_definitions_where(&self, filter: &dyn Fn(&str) -> bool) -> Vec<Value> {
        self.definitions()
            .iter()
            .filter(|d| filter(&d.name))
            .map(ToolDefinition::api_definition)
            .collect()
    }

    /// Execute a tool with unvalidated input
    async fn execute(&self, name: &str, input: Value) -> ToolResult;
}
