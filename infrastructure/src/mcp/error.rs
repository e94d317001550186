//! Error types for capability-provider transports

use thiserror::Error;
use toolhost_domain::tool::value_objects::{ErrorCategory, ToolError};

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Substrings of server error messages that mean "your session is gone".
const SESSION_EXPIRY_PHRASES: &[&str] = &[
    "session expired",
    "session not found",
    "invalid session",
    "unknown session",
    "no valid session",
    "session id",
    "mcp-session-id",
];

/// Errors that can occur when talking to a capability provider
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Authentication failed (HTTP {status}); check the API key. {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Endpoint not found (HTTP 404): {url}. Check the provider URL in the configuration")]
    NotFound { url: String },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {error}\nRaw response: {raw}")]
    ParseError { error: String, raw: String },

    #[error("JSON-RPC error (code {code}): {message}")]
    RpcError { code: i64, message: String },

    #[error("Executable '{0}' not found on PATH")]
    ExecutableNotFound(String),

    #[error("{program} {found} is too old; version {required} or newer is required")]
    RuntimeTooOld {
        program: String,
        found: String,
        required: u32,
    },

    #[error("Failed to spawn provider process: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("Provider process exited with {code}: {stderr}")]
    ProcessFailed { code: String, stderr: String },

    #[error("Provider process produced no output")]
    EmptyOutput,

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl McpError {
    /// Whether a fresh session and one retry may fix this failure.
    pub fn is_session_retryable(&self) -> bool {
        match self {
            McpError::Unauthorized { .. } => true,
            McpError::RpcError { message, .. }
            | McpError::Http { message, .. }
            | McpError::Server { message, .. } => mentions_session_expiry(message),
            _ => false,
        }
    }

    /// Whether the provider should be marked failed afterwards. A failed
    /// provider is health-checked again before its next call.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            McpError::Unauthorized { .. }
                | McpError::NotFound { .. }
                | McpError::Network(_)
                | McpError::ExecutableNotFound(_)
                | McpError::SpawnError(_)
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            McpError::Timeout(_) => ErrorCategory::Timeout,
            McpError::Unauthorized { .. }
            | McpError::NotFound { .. }
            | McpError::Server { .. }
            | McpError::Http { .. }
            | McpError::Network(_) => ErrorCategory::Transport,
            McpError::ParseError { .. }
            | McpError::RpcError { .. }
            | McpError::SerializationError(_)
            | McpError::EmptyOutput => ErrorCategory::Protocol,
            McpError::ExecutableNotFound(_)
            | McpError::RuntimeTooOld { .. }
            | McpError::SpawnError(_)
            | McpError::ProcessFailed { .. } => ErrorCategory::Execution,
        }
    }
}

impl From<McpError> for ToolError {
    fn from(err: McpError) -> Self {
        ToolError::new(err.category(), err.to_string())
    }
}

fn mentions_session_expiry(message: &str) -> bool {
    let lower = message.to_lowercase();
    SESSION_EXPIRY_PHRASES.iter().any(|p| lower.contains(p))
}
