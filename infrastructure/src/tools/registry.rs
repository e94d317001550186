//! Tool Registry
//!
//! The [`ToolRegistry`] owns every named tool and implements
//! [`ToolExecutorPort`]. Execution is uniform for all tools:
//!
//! 1. Look up the name (unknown ⇒ failed result `Tool not found: <name>`)
//! 2. Validate the raw input against the tool's [`Schema`]; explicit `null`
//!    for an optional field is stripped
//! 3. High-risk tools ask the permission gate, when one is configured
//! 4. Run the handler under the tool's timeout (the registry default unless
//!    the definition sets its own or opts out); panics are caught
//!
//! Nothing escapes as a panic or `Err`: every problem becomes a failed
//! [`ToolResult`].
//!
//! # Usage
//!
//! ```ignore
//! let registry = ToolRegistry::new();
//! registry.define(
//!     ToolDefinition::new("echo", "Echo text", Schema::new().field(Field::string("text", "Text").required())),
//!     |input: Value| async move { Ok(ToolResult::success(input["text"].as_str().unwrap_or_default())) },
//! );
//! let result = registry.execute("echo", json!({"text": "hi"})).await;
//! ```

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use toolhost_application::bus::panic_message;
use toolhost_application::human_sync::{GateError, PermissionGate};
use toolhost_application::ports::tool_executor::ToolExecutorPort;
use toolhost_domain::interaction::{PermissionDecision, PermissionRequest};
use toolhost_domain::session::message::identifying_argument;
use toolhost_domain::subagent::summarize_action;
use toolhost_domain::tool::{
    entities::ToolDefinition,
    value_objects::{ToolError, ToolResult},
};
use tracing::{debug, warn};

/// Default bound for handlers whose definition sets no timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// What a tool handler produces.
pub type HandlerResult = Result<ToolResult, ToolError>;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Returned by [`ToolRegistry::define`].
#[derive(Debug, Clone)]
pub struct ToolHandle {
    definition: ToolDefinition,
}

impl ToolHandle {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    handler: Handler,
}

/// Named, schema-validated tools with a uniform execute contract.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
    default_timeout: Duration,
    permission_gate: Option<Arc<PermissionGate>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            default_timeout: DEFAULT_TOOL_TIMEOUT,
            permission_gate: None,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Route high-risk tools through `gate` before they run.
    pub fn with_permission_gate(mut self, gate: Arc<PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    /// Register a tool. A previous registration with the same name is replaced.
    ///
    /// The handler receives schema-validated input.
    pub fn define<F, Fut>(&self, definition: ToolDefinition, handler: F) -> ToolHandle
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = definition.name.clone();
        let entry = RegisteredTool {
            definition: definition.clone(),
            handler: Arc::new(move |input| handler(input).boxed()),
        };

        let replaced = self
            .tools
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.clone(), entry)
            .is_some();
        if replaced {
            debug!(tool = %name, "Tool definition replaced");
        } else {
            debug!(tool = %name, "Registered tool");
        }

        ToolHandle { definition }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Every tool as a function-calling definition, sorted by name.
    pub fn api_definitions(&self) -> Vec<Value> {
        self.api_definitions_where(&|_: &str| true)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RegisteredTool>> {
        self.tools.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, name: &str) -> Option<RegisteredTool> {
        self.read().get(name).cloned()
    }

    async fn check_permission(&self, definition: &ToolDefinition, input: &Value) -> Result<(), ToolError> {
        let Some(gate) = &self.permission_gate else {
            return Ok(());
        };

        let request = PermissionRequest {
            tool: definition.name.clone(),
            summary: summarize_action(&definition.name, identifying_argument(input)),
            input: input.clone(),
        };
        match gate.ask(request).await {
            Ok(PermissionDecision::Allow) => Ok(()),
            Ok(PermissionDecision::Deny) => Err(ToolError::policy(format!(
                "Permission denied for '{}'",
                definition.name
            ))),
            Err(GateError::Rejected(reason)) => Err(ToolError::policy(format!(
                "Permission denied for '{}': {}",
                definition.name, reason
            ))),
            Err(e) => Err(ToolError::concurrency(format!(
                "Permission for '{}' unavailable: {}",
                definition.name, e
            ))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.read().values().map(|t| t.definition.clone()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    async fn execute(&self, name: &str, input: Value) -> ToolResult {
        let Some(tool) = self.lookup(name) else {
            return ToolResult::failure(ToolError::not_found(format!("Tool not found: {}", name)));
        };

        let input = match tool.definition.input_schema.validate(&input) {
            Ok(input) => input,
            Err(e) => {
                debug!(tool = name, error = %e, "Tool input rejected");
                return ToolResult::failure(ToolError::validation(format!(
                    "Invalid input for '{}': {}",
                    name, e
                )));
            }
        };

        if tool.definition.is_high_risk()
            && let Err(e) = self.check_permission(&tool.definition, &input).await
        {
            return ToolResult::failure(e);
        }

        let call = AssertUnwindSafe((tool.handler)(input)).catch_unwind();
        let outcome = match tool.definition.options.timeout.resolve(self.default_timeout) {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = name, timeout_ms = timeout.as_millis() as u64, "Tool timed out");
                    return ToolResult::failure(ToolError::timeout(format!(
                        "Tool '{}' timed out after {:.1}s",
                        name,
                        timeout.as_secs_f64()
                    )));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ToolResult::failure(e),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = name, panic = %message, "Tool handler panicked");
                ToolResult::failure(ToolError::execution(format!(
                    "Tool '{}' panicked: {}",
                    name, message
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolhost_application::bus::EventBus;
    use toolhost_domain::tool::entities::ToolOptions;
    use toolhost_domain::tool::schema::{Field, Schema};
    use toolhost_domain::tool::value_objects::ErrorCategory;

    fn echo_definition() -> ToolDefinition {
        ToolDefinition::new(
            "echo",
            "Echo the text back",
            Schema::new()
                .field(Field::string("text", "Text to echo").required())
                .field(Field::integer("repeat", "Repetitions")),
        )
    }

    fn registry_with_echo(calls: Arc<AtomicUsize>) -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.define(echo_definition(), move |input: Value| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let text = input["text"].as_str().unwrap_or_default().to_string();
                Ok(ToolResult::success(text).with_metadata(input))
            }
        });
        registry
    }

    #[tokio::test]
    async fn test_echo_end_to_end() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_echo(calls.clone());

        let result = registry.execute("echo", json!({"text": "hello"})).await;

        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_null_optional_is_stripped() {
        let registry = registry_with_echo(Arc::new(AtomicUsize::new(0)));

        let result = registry
            .execute("echo", json!({"text": "hi", "repeat": null}))
            .await;

        assert!(result.success);
        assert_eq!(result.metadata, Some(json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_echo(calls.clone());

        let result = registry.execute("echo", json!({"repeat": 2})).await;

        assert!(!result.success);
        assert_eq!(result.error_category(), Some(ErrorCategory::Validation));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nope", json!({})).await;

        assert!(!result.success);
        assert_eq!(result.output, "Tool not found: nope");
        assert_eq!(result.error_category(), Some(ErrorCategory::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_has_no_late_effect() {
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = finished.clone();
        let registry = ToolRegistry::new();
        registry.define(
            ToolDefinition::new("slow", "Sleeps", Schema::new())
                .with_options(ToolOptions::new().with_timeout(Duration::from_secs(1))),
            move |_input: Value| {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    flag.fetch_add(1, Ordering::SeqCst);
                    Ok(ToolResult::success("done"))
                }
            },
        );

        let result = registry.execute("slow", Value::Null).await;
        assert_eq!(result.error_category(), Some(ErrorCategory::Timeout));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_tool_outlives_default_timeout() {
        let registry = ToolRegistry::new().with_default_timeout(Duration::from_secs(1));
        registry.define(
            ToolDefinition::new("long", "Sleeps past the default", Schema::new())
                .with_options(ToolOptions::new().without_timeout()),
            |_input: Value| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(ToolResult::success("done"))
            },
        );

        let result = registry.execute("long", json!({})).await;
        assert!(result.success, "{}", result.output);
        assert_eq!(result.output, "done");
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_become_failures() {
        let registry = ToolRegistry::new();
        registry.define(
            ToolDefinition::new("fails", "Always fails", Schema::new()),
            |_input: Value| async { Err(ToolError::execution("disk on fire")) },
        );
        registry.define(
            ToolDefinition::new("panics", "Always panics", Schema::new()),
            |_input: Value| async {
                if true {
                    panic!("boom");
                }
                Ok(ToolResult::success("unreachable"))
            },
        );

        let failed = registry.execute("fails", json!({})).await;
        assert_eq!(failed.output, "disk on fire");

        let panicked = registry.execute("panics", json!({})).await;
        assert!(!panicked.success);
        assert!(panicked.output.contains("boom"));
    }

    #[tokio::test]
    async fn test_last_definition_wins() {
        let registry = ToolRegistry::new();
        registry.define(
            ToolDefinition::new("greet", "v1", Schema::new()),
            |_input: Value| async { Ok(ToolResult::success("one")) },
        );
        let handle = registry.define(
            ToolDefinition::new("greet", "v2", Schema::new()),
            |_input: Value| async { Ok(ToolResult::success("two")) },
        );

        assert_eq!(handle.name(), "greet");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.execute("greet", json!({})).await.output, "two");
        assert_eq!(registry.definition("greet").unwrap().description, "v2");
    }

    #[tokio::test]
    async fn test_api_definitions_sorted() {
        let registry = registry_with_echo(Arc::new(AtomicUsize::new(0)));
        registry.define(
            ToolDefinition::new("alpha", "First", Schema::new()),
            |_input: Value| async { Ok(ToolResult::success("")) },
        );

        let defs = registry.api_definitions();
        assert_eq!(defs[0]["function"]["name"], "alpha");
        assert_eq!(defs[1]["function"]["name"], "echo");
        assert_eq!(defs[1]["type"], "function");
        assert_eq!(defs[1]["function"]["parameters"]["required"], json!(["text"]));
    }

    fn gated_registry(gate: Arc<PermissionGate>, runs: Arc<AtomicUsize>) -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new().with_permission_gate(gate);
        registry.define(
            ToolDefinition::new(
                "delete_branch",
                "Delete a branch",
                Schema::new().field(Field::string("name", "Branch").required()),
            )
            .with_options(ToolOptions::new().high_risk()),
            move |_input: Value| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(ToolResult::success("deleted"))
                }
            },
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_permission_allow_and_deny() {
        let bus = Arc::new(EventBus::new());
        let gate = Arc::new(PermissionGate::permissions(bus, Duration::from_secs(5)));
        let runs = Arc::new(AtomicUsize::new(0));
        let registry = gated_registry(gate.clone(), runs.clone());

        for (decision, expect_success) in [
            (PermissionDecision::Allow, true),
            (PermissionDecision::Deny, false),
        ] {
            let task = {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.execute("delete_branch", json!({"name": "old"})).await
                })
            };
            while !gate.is_pending() {
                tokio::task::yield_now().await;
            }
            gate.resolve(decision);
            let result = task.await.unwrap();
            assert_eq!(result.success, expect_success, "{}", result.output);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_request_payload() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(move |e| sink.lock().unwrap().push(e.payload.clone()));
        let gate = Arc::new(PermissionGate::permissions(bus, Duration::from_secs(5)));
        let registry = gated_registry(gate.clone(), Arc::new(AtomicUsize::new(0)));

        let task = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.execute("delete_branch", json!({"name": "old"})).await })
        };
        while !gate.is_pending() {
            tokio::task::yield_now().await;
        }
        gate.reject("not today");
        let result = task.await.unwrap();

        assert_eq!(result.error_category(), Some(ErrorCategory::Policy));
        let payload = seen.lock().unwrap()[0].clone();
        assert_eq!(payload["tool"], "delete_branch");
        assert_eq!(payload["input"], json!({"name": "old"}));
    }
}
