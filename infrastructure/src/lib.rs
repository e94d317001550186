//! Infrastructure layer for toolhost
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the tool registry and its tools, the capability-provider
//! client, credential lookup, and configuration file loading.

pub mod config;
pub mod credentials;
pub mod host;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, ConfigValidationError, FileConfig};
pub use credentials::ConfigCredentialSource;
pub use host::ToolHost;
pub use mcp::{McpError, McpManager};
pub use tools::{SubagentSettings, ToolRegistry, register_builtin_tools};
