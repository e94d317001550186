//! Tool domain entities

use super::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Risk level of a tool operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk - read-only operations (e.g., read_file, grep_search)
    #[default]
    Low,
    /// High risk - operations that modify state (e.g., write_file, run_command)
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::High => "high",
        }
    }

    /// High-risk tools ask the permission gate before running.
    pub fn requires_permission(&self) -> bool {
        matches!(self, RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deadline the registry puts on a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolTimeout {
    /// The registry's default timeout
    #[default]
    Default,
    After(Duration),
    /// No registry deadline; the handler bounds its own waits
    Unbounded,
}

impl ToolTimeout {
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        match self {
            ToolTimeout::Default => Some(default),
            ToolTimeout::After(timeout) => Some(timeout),
            ToolTimeout::Unbounded => None,
        }
    }
}

/// Optional execution settings for a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolOptions {
    pub timeout: ToolTimeout,
    pub risk_level: RiskLevel,
}

impl ToolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = ToolTimeout::After(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = ToolTimeout::Unbounded;
        self
    }

    pub fn high_risk(mut self) -> Self {
        self.risk_level = RiskLevel::High;
        self
    }
}

/// Definition of a tool that can be offered to a model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "read_file")
    pub name: String,
    /// Human-readable description
    pub description: String,
    pub input_schema: Schema,
    pub options: ToolOptions,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Schema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            options: ToolOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ToolOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_high_risk(&self) -> bool {
        self.options.risk_level.requires_permission()
    }

    /// Function-calling definition in the shape completion APIs expect.
    pub fn api_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema.to_json_schema(),
            }
        })
    }
}
