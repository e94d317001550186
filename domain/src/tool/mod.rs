//! Tool domain module
//!
//! Pure definitions for the tool system: how a capability is described to a
//! model, how its input is validated, and what it hands back.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDefinition │───▶│ Schema       │───▶│ ToolResult   │
//! │ (registry)     │    │ (validation) │    │ (output)     │
//! └────────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Risk-Based Execution
//!
//! | Risk | Examples | Permission gate |
//! |------|----------|-----------------|
//! | **Low** | `read_file`, `list_files`, `grep_search` | No |
//! | **High** | `write_file`, `run_command` | Yes, when a gate is configured |
//!
//! # Architecture
//!
//! - **Domain** (this module): definitions, schemas and results, no I/O
//! - **Application** (`ToolExecutorPort`): port trait for tool execution
//! - **Infrastructure** (`ToolRegistry`): handlers, timeouts, permission checks

pub mod content;
pub mod entities;
pub mod schema;
pub mod value_objects;

pub use content::ContentPart;
pub use entities::{RiskLevel, ToolDefinition, ToolOptions, ToolTimeout};
pub use schema::{Field, FieldType, Schema, SchemaError};
pub use value_objects::{ErrorCategory, ToolError, ToolResult};
