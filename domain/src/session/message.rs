//! Chat messages exchanged with a completion client.
//!
//! Tool-calling completion APIs return an assistant message that may carry
//! `tool_calls`. Each call has an API-assigned `id`; the result of running it
//! goes back into the history as a [`Role::Tool`] message keyed by that id.
//!
//! ```text
//! system ─▶ user ─▶ assistant{tool_calls:[a,b]} ─▶ tool(a) ─▶ tool(b) ─▶ assistant
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// API-assigned ID for correlating with the tool result
    pub id: String,
    pub name: String,
    /// Arguments as sent by the model. Some APIs send a JSON object, others a
    /// string containing JSON; see [`ToolCallRequest::arguments_object`].
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments normalized to a JSON value, decoding string-encoded JSON.
    ///
    /// An empty or undecodable string yields `Value::Null`, which schema
    /// validation treats as an empty object.
    pub fn arguments_object(&self) -> Value {
        match &self.arguments {
            Value::String(raw) if raw.trim().is_empty() => Value::Null,
            Value::String(raw) => serde_json::from_str(raw).unwrap_or(Value::Null),
            other => other.clone(),
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For `tool` messages: the id of the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For `tool` messages: the tool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant turn that requests tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool-role turn carrying the result of call `call_id`.
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    #[serde(other)]
    Other,
}

/// One completion alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Response of a completion client: `{choices: [{message, finish_reason}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub choices: Vec<Choice>,
}

impl Completion {
    /// Single-choice completion, convenient for tests and adapters.
    pub fn from_message(message: Message, finish_reason: FinishReason) -> Self {
        Self {
            choices: vec![Choice {
                message,
                finish_reason: Some(finish_reason),
            }],
        }
    }

    pub fn first_message(&self) -> Option<&Message> {
        self.choices.first().map(|c| &c.message)
    }
}

/// First string-valued argument, used to label actions in summaries.
pub fn identifying_argument(arguments: &Value) -> Option<&str> {
    const PREFERRED: [&str; 6] = ["path", "file_path", "pattern", "command", "query", "url"];
    let object: &Map<String, Value> = arguments.as_object()?;

    PREFERRED
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .or_else(|| object.values().find_map(Value::as_str))
}
