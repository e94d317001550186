//! Tool implementations
//!
//! Every tool is a [`ToolDefinition`](toolhost_domain::tool::ToolDefinition)
//! plus an async handler registered on a [`ToolRegistry`]:
//!
//! | Module | Tools |
//! |--------|-------|
//! | `file` | `read_file`, `write_file` |
//! | `search` | `list_files`, `grep_search` |
//! | `command` | `run_command` |
//! | `capability` | `search_capabilities`, `describe_capability`, `call_capability` |
//! | `ask_user` | `ask_user` |
//! | `task` | `task` |

pub mod ask_user;
pub mod capability;
pub mod command;
pub mod file;
pub mod registry;
pub mod search;
pub mod task;

pub use registry::{DEFAULT_TOOL_TIMEOUT, HandlerResult, ToolHandle, ToolRegistry};
pub use task::SubagentSettings;

use serde_json::Value;
use std::sync::Arc;
use toolhost_application::bus::EventBus;
use toolhost_domain::tool::value_objects::ToolError;

/// Register the local tools: file, search and command.
pub fn register_builtin_tools(registry: &ToolRegistry, bus: Arc<EventBus>) {
    file::register(registry);
    search::register(registry);
    command::register(registry, bus);
}

/// String argument that the schema already marked required.
pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::validation(format!("Missing required parameter: {}", key)))
}

pub(crate) fn optional_u64(input: &Value, key: &str) -> Option<u64> {
    input.get(key).and_then(Value::as_u64)
}
