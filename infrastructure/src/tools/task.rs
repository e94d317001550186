//! Subagent delegation tool: task
//!
//! The subagent runs against the same registry that hosts this tool. The
//! handler keeps only a [`Weak`] reference so the registry does not own itself.

use super::registry::{HandlerResult, ToolRegistry};
use super::{optional_u64, required_str};
use serde_json::{Value, json};
use std::sync::{Arc, Weak};
use toolhost_application::ports::completion_client::CompletionClient;
use toolhost_application::use_cases::run_subagent::{
    RunSubagentInput, RunSubagentUseCase, SubagentError,
};
use toolhost_domain::subagent::{OperatingMode, SubagentKind};
use toolhost_domain::tool::{
    entities::{ToolDefinition, ToolOptions},
    schema::{Field, FieldType, Schema},
    value_objects::{ToolError, ToolResult},
};

pub const TASK: &str = "task";

/// Everything a `task` call needs besides the registry.
#[derive(Clone)]
pub struct SubagentSettings {
    pub client: Arc<dyn CompletionClient>,
    pub model: String,
    pub mode: OperatingMode,
    /// Used when the call does not set `max_iterations`
    pub max_iterations: Option<usize>,
}

pub fn task_definition() -> ToolDefinition {
    ToolDefinition::new(
        TASK,
        "Delegate a self-contained task to a subagent. 'explore' is read-only; 'general' may edit files and run commands.",
        Schema::new()
            .field(
                Field::string("kind", "Subagent kind")
                    .required()
                    .one_of([SubagentKind::Explore.as_str(), SubagentKind::General.as_str()]),
            )
            .field(Field::string("prompt", "Complete description of the task").required())
            .field(Field::array(
                "allowed_tools",
                FieldType::String,
                "Restrict the subagent further to these tools",
            ))
            .field(Field::integer(
                "max_iterations",
                "Maximum model round-trips (default: 15, at most 50)",
            )),
    )
    // bounded by the iteration cap and the per-call deadlines inside the run
    .with_options(ToolOptions::new().without_timeout())
}

pub fn register(registry: &Arc<ToolRegistry>, settings: SubagentSettings) {
    let weak = Arc::downgrade(registry);
    registry.define(task_definition(), move |input: Value| {
        run_task(input, weak.clone(), settings.clone())
    });
}

async fn run_task(input: Value, registry: Weak<ToolRegistry>, settings: SubagentSettings) -> HandlerResult {
    let kind: SubagentKind = required_str(&input, "kind")?
        .parse()
        .map_err(ToolError::validation)?;
    let prompt = required_str(&input, "prompt")?;

    let Some(registry) = registry.upgrade() else {
        return Err(ToolError::concurrency("Tool registry is shutting down"));
    };

    let mut request = RunSubagentInput::new(kind, prompt).with_mode(settings.mode);
    if let Some(tools) = input["allowed_tools"].as_array() {
        request = request.with_allowed_tools(
            tools.iter().filter_map(Value::as_str).map(String::from).collect(),
        );
    }
    if let Some(max) = optional_u64(&input, "max_iterations")
        .map(|n| n as usize)
        .or(settings.max_iterations)
    {
        request = request.with_max_iterations(max);
    }

    let use_case = RunSubagentUseCase::new(settings.client, registry, settings.model);
    let output = use_case.execute(request).await.map_err(|e| match e {
        SubagentError::ModeForbids { .. } => ToolError::policy(e.to_string()),
        SubagentError::Completion(_) => ToolError::transport(e.to_string()),
        SubagentError::EmptyCompletion => ToolError::protocol(e.to_string()),
        SubagentError::MaxIterationsExceeded { ref actions, .. } => {
            let details = format!("actions taken: {}", actions.join(", "));
            ToolError::execution(e.to_string()).with_details(details)
        }
    })?;

    let mut text = output.output.clone();
    text.push_str(&format!(
        "\n\n[{} subagent finished after {} iterations]",
        output.kind, output.iterations
    ));
    if !output.actions.is_empty() {
        text.push_str("\nActions:");
        for action in &output.actions {
            text.push_str(&format!("\n- {}", action));
        }
    }

    Ok(ToolResult::success(text).with_metadata(json!({
        "kind": output.kind,
        "iterations": output.iterations,
        "actions": output.actions,
    })))
}
