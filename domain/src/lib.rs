//! Domain layer for toolhost
//!
//! This crate contains the core types of the tool-execution host: schemas,
//! tool definitions and results, capability-provider configuration and state,
//! the discovery catalog, subagent profiles, and the payloads exchanged with a
//! human operator. It performs no I/O.
//!
//! # Core Concepts
//!
//! - **Tool**: a named capability with a [`Schema`]-validated input that
//!   always produces a [`ToolResult`]
//! - **Provider**: an external tool server reached over stdio or HTTP
//! - **Catalog**: a searchable, flat view of every provider tool
//! - **Subagent**: a bounded, tool-restricted delegated conversation

pub mod discovery;
pub mod interaction;
pub mod providers;
pub mod session;
pub mod subagent;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use discovery::{CatalogEntry, SearchHit};
pub use interaction::{Answer, PermissionDecision, PermissionRequest, Question};
pub use providers::{
    ConnectionStatus, ConnectionSummary, ProviderConfig, ProviderName, ProviderState, RemoteTool,
    TransportConfig,
};
pub use session::{Completion, FinishReason, Message, Role, ToolCallRequest};
pub use subagent::{OperatingMode, SubagentKind};
pub use tool::{
    ContentPart, ErrorCategory, Field, FieldType, RiskLevel, Schema, SchemaError, ToolDefinition,
    ToolError, ToolOptions, ToolResult, ToolTimeout,
};
