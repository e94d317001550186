//! Composition root: one bus, one registry, the provider manager and both
//! human-sync gates, wired together.

use crate::config::{ConfigValidationError, FileConfig};
use crate::credentials::ConfigCredentialSource;
use crate::mcp::McpManager;
use crate::tools::{self, SubagentSettings, ToolRegistry};
use std::sync::Arc;
use toolhost_application::bus::EventBus;
use toolhost_application::config::ExecutionParams;
use toolhost_application::human_sync::{PermissionGate, QuestionGate};
use toolhost_application::ports::capability_source::CapabilitySource;
use toolhost_application::ports::completion_client::CompletionClient;
use toolhost_application::ports::credentials::CredentialSource;
use toolhost_application::use_cases::capability_discovery::CapabilityDiscovery;
use toolhost_domain::providers::ProviderConfig;
use toolhost_domain::subagent::OperatingMode;
use tracing::info;

pub struct ToolHost {
    pub bus: Arc<EventBus>,
    pub registry: Arc<ToolRegistry>,
    pub providers: McpManager,
    pub discovery: Arc<CapabilityDiscovery>,
    pub questions: Arc<QuestionGate>,
    pub permissions: Arc<PermissionGate>,
    params: ExecutionParams,
    mode: OperatingMode,
}

impl ToolHost {
    pub fn from_config(config: &FileConfig) -> Result<Self, ConfigValidationError> {
        let credentials = ConfigCredentialSource::new(config.credentials.api_key.clone());
        Ok(Self::new(
            config.provider_configs()?,
            Arc::new(credentials),
            config.execution_params(),
            config.subagent.mode,
        ))
    }

    /// Build the host with every tool except `task`, which needs a
    /// completion client (see [`ToolHost::enable_subagents`]).
    pub fn new(
        providers: Vec<ProviderConfig>,
        credentials: Arc<dyn CredentialSource>,
        params: ExecutionParams,
        mode: OperatingMode,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let questions = Arc::new(QuestionGate::questions(bus.clone(), params.human_sync_timeout));
        let permissions = Arc::new(PermissionGate::permissions(
            bus.clone(),
            params.human_sync_timeout,
        ));

        let registry = Arc::new(
            ToolRegistry::new()
                .with_default_timeout(params.default_tool_timeout)
                .with_permission_gate(permissions.clone()),
        );

        let manager = McpManager::new(providers, credentials, bus.clone(), &params);
        let source: Arc<dyn CapabilitySource> = Arc::new(manager.clone());
        let discovery = Arc::new(CapabilityDiscovery::new(source.clone()));

        tools::register_builtin_tools(&registry, bus.clone());
        tools::capability::register(
            &registry,
            discovery.clone(),
            source,
            params.capability_call_timeout(),
        );
        tools::ask_user::register(&registry, questions.clone());

        info!(tools = registry.len(), mode = %mode, "Tool host ready");

        Self {
            bus,
            registry,
            providers: manager,
            discovery,
            questions,
            permissions,
            params,
            mode,
        }
    }

    /// Register the `task` tool, delegating to `client`.
    pub fn enable_subagents(&self, client: Arc<dyn CompletionClient>) {
        tools::task::register(
            &self.registry,
            SubagentSettings {
                client,
                model: self.params.subagent_model.clone(),
                mode: self.mode,
                max_iterations: Some(self.params.subagent_max_iterations),
            },
        );
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhost_application::ports::credentials::StaticCredentials;
    use serde_json::json;
    use std::time::Duration;
    use toolhost_application::ports::completion_client::{CompletionError, CompletionRequest};
    use toolhost_application::ports::tool_executor::ToolExecutorPort;
    use toolhost_domain::session::Completion;
    use toolhost_domain::tool::ToolTimeout;
    use toolhost_domain::tool::value_objects::ErrorCategory;

    fn host() -> ToolHost {
        let providers = ProviderConfig::defaults()
            .into_iter()
            .map(|mut p| {
                p.enabled = false;
                p
            })
            .collect();
        ToolHost::new(
            providers,
            Arc::new(StaticCredentials::default()),
            ExecutionParams::default(),
            OperatingMode::Normal,
        )
    }

    #[test]
    fn test_registers_model_facing_tools() {
        let host = host();
        let names = host.registry.names();
        for expected in [
            "ask_user",
            "call_capability",
            "describe_capability",
            "grep_search",
            "list_files",
            "read_file",
            "run_command",
            "search_capabilities",
            "write_file",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert!(!host.registry.has_tool("task"));
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let config: FileConfig = toml::from_str("[providers.nope]\nenabled = true\n").unwrap();
        assert!(ToolHost::from_config(&config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_question_ends_at_human_sync_deadline() {
        let host = host();
        let started = tokio::time::Instant::now();

        let result = host
            .registry
            .execute("ask_user", json!({"question": "Which branch?"}))
            .await;

        assert_eq!(result.error_category(), Some(ErrorCategory::Timeout));
        assert!(result.output.starts_with("The user did not answer"), "{}", result.output);
        let elapsed = started.elapsed();
        assert!(elapsed >= host.params().human_sync_timeout);
        assert!(elapsed < host.params().human_sync_tool_timeout());
        assert!(!host.questions.is_pending());
    }

    struct NoCompletions;

    #[async_trait::async_trait]
    impl CompletionClient for NoCompletions {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, CompletionError> {
            unreachable!("not called")
        }
    }

    #[test]
    fn test_tool_deadlines_follow_execution_params() {
        let host = host();
        host.enable_subagents(Arc::new(NoCompletions));
        let params = host.params().clone();

        let timeout_of = |name: &str| {
            host.registry
                .definitions()
                .into_iter()
                .find(|d| d.name == name)
                .map(|d| d.options.timeout)
                .unwrap()
        };

        assert_eq!(timeout_of("ask_user"), ToolTimeout::After(params.human_sync_tool_timeout()));
        assert_eq!(timeout_of("call_capability"), ToolTimeout::After(params.capability_call_timeout()));
        assert_eq!(timeout_of("task"), ToolTimeout::Unbounded);
        assert_eq!(timeout_of("read_file"), ToolTimeout::Default);
        assert!(params.human_sync_tool_timeout() > Duration::from_secs(300));
    }
}
