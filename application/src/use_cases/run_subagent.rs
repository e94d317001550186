//! Run Subagent use case.
//!
//! A subagent is a bounded, tool-restricted conversation delegated by the main
//! agent. Each iteration asks the completion client for the next message,
//! offering only allow-listed tools. Requested tool calls run sequentially in
//! the order the model asked for them; calls outside the allow-list are
//! answered with a rejection and never executed.
//!
//! ```text
//! complete(history, allowed tools) ──▶ no tool calls ──▶ Ok(text)
//!         ▲                         │
//!         │                         ▼ for each call, in order
//!         │                 allowed? ──no──▶ tool(id): rejection
//!         │                    │yes
//!         │                    ▼
//!         └──── tool(id): result ◀── execute ── summary "tool(arg)"
//! ```
//!
//! Running out of iterations is a terminal error.

use crate::ports::completion_client::{CompletionClient, CompletionError, CompletionRequest};
use crate::ports::tool_executor::ToolExecutorPort;
use std::sync::Arc;
use thiserror::Error;
use toolhost_domain::session::message::identifying_argument;
use toolhost_domain::session::{Message, ToolCallRequest};
use toolhost_domain::subagent::{
    OperatingMode, SubagentKind, effective_max_iterations, summarize_action,
};
use tracing::{debug, info, warn};

/// Errors that end a subagent run
#[derive(Error, Debug)]
pub enum SubagentError {
    #[error("The {kind} subagent is not available in {mode} mode")]
    ModeForbids {
        kind: SubagentKind,
        mode: OperatingMode,
    },

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Completion returned no choices")]
    EmptyCompletion,

    #[error("Subagent exceeded {max} iterations without finishing")]
    MaxIterationsExceeded { max: usize, actions: Vec<String> },
}

/// Input for a subagent run
#[derive(Debug, Clone)]
pub struct RunSubagentInput {
    pub kind: SubagentKind,
    pub prompt: String,
    /// Narrows the profile's allow-list; names outside the profile are ignored
    pub allowed_tools: Option<Vec<String>>,
    pub max_iterations: Option<usize>,
    /// Operating mode of the parent agent
    pub mode: OperatingMode,
}

impl RunSubagentInput {
    pub fn new(kind: SubagentKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            allowed_tools: None,
            max_iterations: None,
            mode: OperatingMode::default(),
        }
    }

    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    fn allows(&self, tool: &str) -> bool {
        self.kind.tool_access().permits(tool)
            && self
                .allowed_tools
                .as_ref()
                .is_none_or(|list| list.iter().any(|t| t == tool))
    }
}

/// Output of a completed subagent run
#[derive(Debug, Clone, PartialEq)]
pub struct SubagentOutput {
    pub kind: SubagentKind,
    /// Final text of the model
    pub output: String,
    pub iterations: usize,
    /// One `tool(arg)` entry per executed tool call
    pub actions: Vec<String>,
}

/// Use case for running a subagent
pub struct RunSubagentUseCase {
    client: Arc<dyn CompletionClient>,
    tools: Arc<dyn ToolExecutorPort>,
    model: String,
}

impl RunSubagentUseCase {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        tools: Arc<dyn ToolExecutorPort>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tools,
            model: model.into(),
        }
    }

    pub async fn execute(&self, input: RunSubagentInput) -> Result<SubagentOutput, SubagentError> {
        if !input.mode.permits(input.kind) {
            warn!(kind = %input.kind, mode = %input.mode, "Subagent kind rejected by mode policy");
            return Err(SubagentError::ModeForbids {
                kind: input.kind,
                mode: input.mode,
            });
        }

        let max_iterations = effective_max_iterations(input.max_iterations);
        let tool_definitions = self.tools.api_definitions_where(&|name: &str| input.allows(name));
        let mut messages = vec![
            Message::system(input.kind.system_prompt()),
            Message::user(input.prompt.clone()),
        ];
        let mut actions = Vec::new();

        info!(
            kind = %input.kind,
            tools = tool_definitions.len(),
            max_iterations,
            "Starting subagent"
        );

        for iteration in 1..=max_iterations {
            let completion = self
                .client
                .complete(CompletionRequest {
                    model: self.model.clone(),
                    messages: messages.clone(),
                    tools: tool_definitions.clone(),
                })
                .await?;

            let message = completion
                .first_message()
                .cloned()
                .ok_or(SubagentError::EmptyCompletion)?;

            if !message.has_tool_calls() {
                info!(kind = %input.kind, iterations = iteration, "Subagent finished");
                return Ok(SubagentOutput {
                    kind: input.kind,
                    output: message.text().to_string(),
                    iterations: iteration,
                    actions,
                });
            }

            let calls = message.tool_calls.clone();
            messages.push(message);

            for call in &calls {
                let reply = self.run_call(&input, call, &mut actions).await;
                messages.push(reply);
            }

            debug!(
                "Subagent iteration {}/{}: answered {} tool calls",
                iteration,
                max_iterations,
                calls.len()
            );
        }

        warn!(kind = %input.kind, max_iterations, "Subagent exceeded iteration cap");
        Err(SubagentError::MaxIterationsExceeded {
            max: max_iterations,
            actions,
        })
    }

    async fn run_call(
        &self,
        input: &RunSubagentInput,
        call: &ToolCallRequest,
        actions: &mut Vec<String>,
    ) -> Message {
        if !input.allows(&call.name) {
            warn!(
                tool = %call.name,
                kind = %input.kind,
                "Rejected tool call outside the subagent allow-list"
            );
            return Message::tool_result(
                &call.id,
                &call.name,
                format!(
                    "Error: tool '{}' is not available to the {} subagent",
                    call.name, input.kind
                ),
            );
        }

        let arguments = call.arguments_object();
        actions.push(summarize_action(&call.name, identifying_argument(&arguments)));

        let result = self.tools.execute(&call.name, arguments).await;
        let content = if result.is_success() {
            result.output
        } else {
            format!("Error: {}", result.output)
        };
        Message::tool_result(&call.id, &call.name, content)
    }
}
