//! JSON-RPC protocol types for capability providers.
//!
//! Only two methods are used:
//!
//! - `tools/list` returns `{"tools": [...]}`; it doubles as the HTTP health
//!   probe and the session-refresh request.
//! - `tools/call` takes `{"name", "arguments"}` and returns
//!   `{"content": [...], "isError"?: bool}`.

use super::error::McpError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use toolhost_domain::providers::RemoteTool;
use toolhost_domain::tool::content::ContentPart;
use toolhost_domain::tool::value_objects::{ToolError, ToolResult};

/// Output used when a successful call carries no text part.
pub const NO_TEXT_CONTENT: &str = "Tool returned no text content";

pub const METHOD_LIST_TOOLS: &str = "tools/list";
pub const METHOD_CALL_TOOL: &str = "tools/call";

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }

    pub fn list_tools() -> Self {
        Self::new(METHOD_LIST_TOOLS, Some(json!({})))
    }

    pub fn call_tool(name: &str, arguments: Value) -> Self {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        Self::new(
            METHOD_CALL_TOOL,
            Some(json!({ "name": name, "arguments": arguments })),
        )
    }
}

/// JSON-RPC response
///
/// Some servers answer with string ids, so the id is kept as raw JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// A response envelope carries either a result or an error.
    pub fn is_envelope(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    pub fn into_result(self) -> Result<Value, McpError> {
        match (self.error, self.result) {
            (Some(err), _) => Err(McpError::RpcError {
                code: err.code,
                message: err.message,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(McpError::ParseError {
                error: "response has neither result nor error".to_string(),
                raw: String::new(),
            }),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Result of `tools/list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<RemoteTool>,
}

impl ListToolsResult {
    pub fn from_value(value: Value) -> Result<Self, McpError> {
        serde_json::from_value(value.clone()).map_err(|e| McpError::ParseError {
            error: e.to_string(),
            raw: value.to_string(),
        })
    }
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// Turn the outcome of a `tools/call` exchange into a tool result.
pub fn normalize_call_result(result: Value) -> ToolResult {
    let call: CallToolResult = match serde_json::from_value(result.clone()) {
        Ok(call) => call,
        Err(e) => {
            return ToolResult::failure(
                ToolError::protocol(format!("Malformed tools/call result: {}", e))
                    .with_details(result.to_string()),
            );
        }
    };

    let text = ContentPart::join_text(&call.content).unwrap_or_else(|| NO_TEXT_CONTENT.to_string());
    if call.is_error {
        ToolResult::failure(ToolError::protocol(text))
    } else {
        ToolResult::success(text)
    }
}
