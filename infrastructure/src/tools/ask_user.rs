//! Clarifying-question tool: ask_user

use super::registry::{HandlerResult, ToolRegistry};
use super::required_str;
use serde_json::{Value, json};
use std::sync::Arc;
use toolhost_application::config::HANDLER_GRACE;
use toolhost_application::human_sync::{GateError, QuestionGate};
use toolhost_domain::interaction::Question;
use toolhost_domain::tool::{
    entities::{ToolDefinition, ToolOptions},
    schema::{Field, FieldType, Schema},
    value_objects::{ToolError, ToolResult},
};

pub const ASK_USER: &str = "ask_user";

pub fn ask_user_definition() -> ToolDefinition {
    ToolDefinition::new(
        ASK_USER,
        "Ask the user a clarifying question and wait for the answer. Only one question can be pending at a time.",
        Schema::new()
            .field(Field::string("question", "The question to ask").required())
            .field(Field::array(
                "options",
                FieldType::String,
                "Suggested answers (omit for a free-form answer)",
            )),
    )
}

/// The registry deadline outlasts the gate's own, so an unanswered question
/// ends as the gate's timeout.
pub fn register(registry: &ToolRegistry, gate: Arc<QuestionGate>) {
    let options = ToolOptions::new().with_timeout(gate.timeout() + HANDLER_GRACE);
    registry.define(ask_user_definition().with_options(options), move |input: Value| {
        ask_user(input, gate.clone())
    });
}

async fn ask_user(input: Value, gate: Arc<QuestionGate>) -> HandlerResult {
    let question = required_str(&input, "question")?;
    let options: Vec<&str> = input["options"]
        .as_array()
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let answer = gate
        .ask(Question::new(question).with_options(options))
        .await
        .map_err(|e| match e {
            GateError::Busy => ToolError::concurrency(e.to_string()),
            GateError::Timeout(_) => ToolError::timeout(format!("The user did not answer: {}", e)),
            GateError::Rejected(_) => ToolError::policy(e.to_string()),
            GateError::Closed => ToolError::concurrency(e.to_string()),
        })?;

    Ok(ToolResult::success(answer.text).with_metadata(json!({ "question": question })))
}
