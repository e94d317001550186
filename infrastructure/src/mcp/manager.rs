//! Capability-provider manager.
//!
//! Owns the runtime state of every configured provider and implements
//! [`CapabilitySource`] on top of the stdio and HTTP transports.
//!
//! Initialization is lazy and shared: the first caller of
//! [`ensure_initialized`](CapabilitySource::ensure_initialized) probes every
//! enabled provider concurrently, later and concurrent callers wait for that
//! same run. Without an API key the run is deferred instead of failed, and the
//! next caller tries again.
//!
//! Every status transition is published as `provider.status_changed`.

use super::error::McpError;
use super::http::HttpTransport;
use super::protocol::{JsonRpcRequest, ListToolsResult, normalize_call_result};
use super::stdio::StdioTransport;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use toolhost_application::bus::topics::{self, ProviderStatusChanged};
use toolhost_application::bus::{EventBus, EventDefinition};
use toolhost_application::config::ExecutionParams;
use toolhost_application::ports::capability_source::CapabilitySource;
use toolhost_application::ports::credentials::CredentialSource;
use toolhost_domain::providers::{
    ConnectionStatus, ConnectionSummary, ProviderConfig, ProviderName, ProviderState, RemoteTool,
    TransportConfig,
};
use toolhost_domain::tool::value_objects::{ToolError, ToolResult};
use tracing::{debug, info, warn};

/// Initialization was skipped because no API key is configured.
#[derive(Debug)]
struct CredentialMissing;

struct ManagerInner {
    states: RwLock<BTreeMap<ProviderName, ProviderState>>,
    credentials: Arc<dyn CredentialSource>,
    bus: Arc<EventBus>,
    status_event: EventDefinition<ProviderStatusChanged>,
    client: reqwest::Client,
    health_check_timeout: Duration,
    tool_call_timeout: Duration,
    init: OnceCell<()>,
    waiting_for_credential: AtomicBool,
}

/// Manager for the fixed set of capability providers.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct McpManager {
    inner: Arc<ManagerInner>,
}

impl McpManager {
    pub fn new(
        configs: Vec<ProviderConfig>,
        credentials: Arc<dyn CredentialSource>,
        bus: Arc<EventBus>,
        params: &ExecutionParams,
    ) -> Self {
        let states = configs
            .into_iter()
            .map(|config| (config.name, ProviderState::new(config)))
            .collect();

        Self {
            inner: Arc::new(ManagerInner {
                states: RwLock::new(states),
                credentials,
                bus,
                status_event: topics::provider_status_changed(),
                client: reqwest::Client::new(),
                health_check_timeout: params.health_check_timeout,
                tool_call_timeout: params.tool_call_timeout,
                init: OnceCell::new(),
                waiting_for_credential: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.initialized()
    }

    pub fn is_waiting_for_credential(&self) -> bool {
        self.inner.waiting_for_credential.load(Ordering::SeqCst)
    }

    pub async fn state(&self, provider: ProviderName) -> Option<ProviderState> {
        self.inner.states.read().await.get(&provider).cloned()
    }

    async fn initialize(&self) -> Result<(), CredentialMissing> {
        let credentials = self.inner.credentials.load().await;
        let Some(api_key) = credentials.api_key().map(str::to_string) else {
            self.inner.waiting_for_credential.store(true, Ordering::SeqCst);
            return Err(CredentialMissing);
        };
        self.inner.waiting_for_credential.store(false, Ordering::SeqCst);

        let enabled: Vec<ProviderName> = self
            .inner
            .states
            .read()
            .await
            .values()
            .filter(|s| s.config.enabled)
            .map(ProviderState::name)
            .collect();

        info!(providers = enabled.len(), "Initializing capability providers");
        join_all(enabled.into_iter().map(|name| self.init_provider(name, &api_key))).await;
        Ok(())
    }

    async fn init_provider(&self, name: ProviderName, api_key: &str) {
        let Some(config) = self.state(name).await.map(|s| s.config) else {
            return;
        };

        let outcome = match &config.transport {
            TransportConfig::Stdio { .. } => self.check_stdio(&config, api_key).await,
            TransportConfig::Http { url, .. } => self.probe_http(url, api_key).await,
        };

        let snapshot = {
            let mut states = self.inner.states.write().await;
            let Some(state) = states.get_mut(&name) else {
                return;
            };
            match outcome {
                Ok((tools, session_id)) => {
                    info!(provider = %name, tools = tools.len(), "Capability provider connected");
                    state.mark_connected(tools);
                    state.session_id = session_id;
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Capability provider failed health check");
                    state.mark_failed(e.to_string());
                }
            }
            state.clone()
        };
        self.publish_status(&snapshot);
    }

    /// Executable and runtime checks, then a best-effort tool listing.
    async fn check_stdio(
        &self,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<(Vec<RemoteTool>, Option<String>), McpError> {
        let Some(transport) = StdioTransport::from_config(&config.transport) else {
            return Ok((Vec::new(), None));
        };
        let path = transport.check_available().await?;
        debug!(provider = %config.name, path = %path.display(), "Provider executable resolved");

        let listing = transport
            .call(
                &JsonRpcRequest::list_tools(),
                api_key,
                self.inner.health_check_timeout,
            )
            .await
            .and_then(|response| response.into_result())
            .and_then(ListToolsResult::from_value);

        let tools = match listing {
            Ok(list) => list.tools,
            Err(e) => {
                debug!(provider = %config.name, error = %e, "Tool listing unavailable");
                Vec::new()
            }
        };
        Ok((tools, None))
    }

    async fn probe_http(
        &self,
        url: &str,
        api_key: &str,
    ) -> Result<(Vec<RemoteTool>, Option<String>), McpError> {
        let transport = HttpTransport::new(self.inner.client.clone(), url);
        let reply = transport
            .send(
                &JsonRpcRequest::list_tools(),
                api_key,
                None,
                self.inner.health_check_timeout,
            )
            .await?;
        let session_id = reply.session_id;
        let tools = ListToolsResult::from_value(reply.response.into_result()?)?.tools;
        Ok((tools, session_id))
    }

    fn publish_status(&self, state: &ProviderState) {
        self.inner.bus.publish(
            &self.inner.status_event,
            &ProviderStatusChanged {
                provider: state.name(),
                status: state.status,
                error: state.error.clone(),
                tool_count: state.tools.len(),
            },
        );
    }

    async fn mark_failed(&self, provider: ProviderName, error: &McpError) {
        let snapshot = {
            let mut states = self.inner.states.write().await;
            let Some(state) = states.get_mut(&provider) else {
                return;
            };
            state.mark_failed(error.to_string());
            state.clone()
        };
        warn!(provider = %provider, error = %error, "Capability provider marked failed");
        self.publish_status(&snapshot);
    }

    async fn store_session(&self, provider: ProviderName, session_id: String) {
        let mut states = self.inner.states.write().await;
        if let Some(state) = states.get_mut(&provider)
            && state.session_id.as_deref() != Some(session_id.as_str())
        {
            debug!(provider = %provider, "Session id updated");
            state.session_id = Some(session_id);
        }
    }

    async fn call_stdio(
        &self,
        config: &ProviderConfig,
        tool: &str,
        args: Value,
        api_key: &str,
    ) -> Result<Value, McpError> {
        let Some(transport) = StdioTransport::from_config(&config.transport) else {
            return Err(McpError::Network("provider has no stdio transport".to_string()));
        };
        transport
            .call(
                &JsonRpcRequest::call_tool(tool, args),
                api_key,
                self.inner.tool_call_timeout,
            )
            .await?
            .into_result()
    }

    async fn call_http(
        &self,
        state: &ProviderState,
        url: &str,
        tool: &str,
        args: Value,
        api_key: &str,
    ) -> Result<Value, McpError> {
        let provider = state.name();
        let affinity = state.config.session_affinity();
        let transport = HttpTransport::new(self.inner.client.clone(), url);
        let session = if affinity { state.session_id.clone() } else { None };

        let request = JsonRpcRequest::call_tool(tool, args.clone());
        let first = self
            .http_exchange(provider, &transport, &request, api_key, session, affinity)
            .await;

        match first {
            Err(e) if affinity && e.is_session_retryable() => {
                warn!(provider = %provider, error = %e, "Session rejected, refreshing and retrying once");
                let session = self.refresh_session(provider, &transport, api_key).await?;
                let retry = JsonRpcRequest::call_tool(tool, args);
                self.http_exchange(provider, &transport, &retry, api_key, session, affinity)
                    .await
            }
            other => other,
        }
    }

    async fn http_exchange(
        &self,
        provider: ProviderName,
        transport: &HttpTransport,
        request: &JsonRpcRequest,
        api_key: &str,
        session: Option<String>,
        affinity: bool,
    ) -> Result<Value, McpError> {
        let reply = transport
            .send(
                request,
                api_key,
                session.as_deref(),
                self.inner.tool_call_timeout,
            )
            .await?;
        if affinity && let Some(id) = reply.session_id {
            self.store_session(provider, id).await;
        }
        reply.response.into_result()
    }

    /// Probe with `tools/list` and no session id to obtain a fresh one.
    async fn refresh_session(
        &self,
        provider: ProviderName,
        transport: &HttpTransport,
        api_key: &str,
    ) -> Result<Option<String>, McpError> {
        let reply = transport
            .send(
                &JsonRpcRequest::list_tools(),
                api_key,
                None,
                self.inner.health_check_timeout,
            )
            .await?;
        let result = reply.response.into_result()?;

        let mut states = self.inner.states.write().await;
        if let Some(state) = states.get_mut(&provider) {
            if reply.session_id.is_some() {
                state.session_id = reply.session_id.clone();
            }
            if let Ok(list) = ListToolsResult::from_value(result) {
                state.tools = list.tools;
            }
        }
        Ok(reply.session_id)
    }
}

#[async_trait]
impl CapabilitySource for McpManager {
    async fn ensure_initialized(&self) {
        if self.inner.init.get_or_try_init(|| self.initialize()).await.is_err() {
            debug!("Provider initialization deferred until an API key is configured");
        }
    }

    async fn provider_states(&self) -> Vec<ProviderState> {
        self.inner.states.read().await.values().cloned().collect()
    }

    async fn call_tool(&self, provider: ProviderName, tool: &str, args: Value) -> ToolResult {
        self.ensure_initialized().await;
        if !self.is_initialized() {
            return ToolResult::failure(ToolError::concurrency(
                "Capability providers are not initialized: no API key is configured",
            ));
        }

        let credentials = self.inner.credentials.load().await;
        let Some(api_key) = credentials.api_key() else {
            return ToolResult::failure(ToolError::concurrency(
                "No API key is configured for capability providers",
            ));
        };

        let mut state = self.state(provider).await;
        if state.as_ref().is_some_and(|s| s.status == ConnectionStatus::Failed) {
            debug!(provider = %provider, "Re-checking failed provider before the call");
            self.init_provider(provider, api_key).await;
            state = self.state(provider).await;
        }

        let Some(state) = state else {
            return ToolResult::failure(ToolError::not_found(format!(
                "Provider '{}' is not configured",
                provider
            )));
        };
        match state.status {
            ConnectionStatus::Connected => {}
            ConnectionStatus::Disabled => {
                return ToolResult::failure(ToolError::policy(format!(
                    "Provider '{}' is disabled",
                    provider
                )));
            }
            ConnectionStatus::Failed | ConnectionStatus::Pending => {
                return ToolResult::failure(ToolError::transport(format!(
                    "Provider '{}' is unavailable: {}",
                    provider,
                    state.error.as_deref().unwrap_or("not connected")
                )));
            }
        }

        debug!(provider = %provider, tool, "Calling provider tool");
        let outcome = match &state.config.transport {
            TransportConfig::Stdio { .. } => {
                self.call_stdio(&state.config, tool, args, api_key).await
            }
            TransportConfig::Http { url, .. } => {
                self.call_http(&state, url, tool, args, api_key).await
            }
        };

        match outcome {
            Ok(result) => normalize_call_result(result),
            Err(e) => {
                if e.is_connection_loss() {
                    self.mark_failed(provider, &e).await;
                }
                ToolResult::failure(e.into())
            }
        }
    }

    async fn find_tool_server(&self, tool: &str) -> Option<ProviderName> {
        self.inner
            .states
            .read()
            .await
            .values()
            .find(|s| s.knows_tool(tool))
            .map(ProviderState::name)
    }

    /// Non-blocking: starts initialization in the background when needed.
    async fn connection_summary(&self) -> ConnectionSummary {
        if !self.is_initialized() {
            let manager = self.clone();
            tokio::spawn(async move { manager.ensure_initialized().await });
        }
        let states = self.inner.states.read().await;
        ConnectionSummary::from_states(states.values(), self.is_waiting_for_credential())
    }
}
