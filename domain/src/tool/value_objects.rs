//! Tool domain value objects: results and errors
//!
//! Every path through the tool system ends in a [`ToolResult`]. Failures are
//! ordinary results too: a [`ToolError`] is folded into a failed result whose
//! `output` is the error message and whose `metadata` records the
//! [`ErrorCategory`], so the model can read and reason about what went wrong.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Broad classification of a tool failure.
///
/// | Category | Raised when |
/// |----------|-------------|
/// | `validation` | input rejected by the schema before any handler runs |
/// | `not_found` | unknown tool, provider or resource |
/// | `transport` | network or process failure, non-2xx status, non-zero exit |
/// | `protocol` | well-formed RPC envelope carrying an error |
/// | `policy` | allow-list or mode forbids the action, permission denied |
/// | `concurrency` | human-sync gate busy, iteration cap, provider not ready |
/// | `timeout` | handler or remote call exceeded its deadline |
/// | `execution` | handler reported its own failure |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Transport,
    Protocol,
    Policy,
    Concurrency,
    Timeout,
    Execution,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Policy => "policy",
            ErrorCategory::Concurrency => "concurrency",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Execution => "execution",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that occurred while executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub category: ErrorCategory,
    /// Human-readable message, shown to the model as the result output
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transport, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Protocol, message)
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Policy, message)
    }

    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Concurrency, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Execution, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution.
///
/// `output` is always display-safe, whether or not the call succeeded.
/// `metadata` is tool-specific; `None` means no structured data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            metadata: None,
        }
    }

    pub fn failure(error: ToolError) -> Self {
        let metadata = json!({
            "error": {
                "category": error.category,
                "details": error.details,
            }
        });
        Self {
            success: false,
            output: error.to_string(),
            metadata: Some(metadata),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Category recorded by [`ToolResult::failure`], if any.
    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.metadata
            .as_ref()?
            .get("error")?
            .get("category")
            .and_then(|c| serde_json::from_value(c.clone()).ok())
    }
}

impl From<ToolError> for ToolResult {
    fn from(error: ToolError) -> Self {
        ToolResult::failure(error)
    }
}
