//! Runtime state of capability providers.

use super::config::{ProviderConfig, ProviderName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection status of a provider.
///
/// ```text
/// Pending ──(health check)──▶ Connected ──(call failure)──▶ Failed
///         └────────────────▶ Failed
/// Disabled (switched off in configuration, never probed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Failed,
    Disabled,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
            ConnectionStatus::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool advertised by a provider's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Configuration plus everything learned about a provider at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderState {
    pub config: ProviderConfig,
    pub status: ConnectionStatus,
    pub error: Option<String>,
    /// HTTP session-affinity id, refreshed in place
    pub session_id: Option<String>,
    pub tools: Vec<RemoteTool>,
}

impl ProviderState {
    pub fn new(config: ProviderConfig) -> Self {
        let status = if config.enabled {
            ConnectionStatus::Pending
        } else {
            ConnectionStatus::Disabled
        };
        Self {
            config,
            status,
            error: None,
            session_id: None,
            tools: Vec::new(),
        }
    }

    pub fn name(&self) -> ProviderName {
        self.config.name
    }

    pub fn mark_connected(&mut self, tools: Vec<RemoteTool>) {
        self.status = ConnectionStatus::Connected;
        self.error = None;
        self.tools = tools;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = ConnectionStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn knows_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Aggregate view reported to status-polling callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub total: usize,
    pub connected: usize,
    pub failed: usize,
    pub waiting_for_credential: bool,
}

impl ConnectionSummary {
    pub fn from_states<'a>(
        states: impl IntoIterator<Item = &'a ProviderState>,
        waiting_for_credential: bool,
    ) -> Self {
        let mut summary = ConnectionSummary {
            waiting_for_credential,
            ..Default::default()
        };
        for state in states {
            summary.total += 1;
            match state.status {
                ConnectionStatus::Connected => summary.connected += 1,
                ConnectionStatus::Failed => summary.failed += 1,
                ConnectionStatus::Pending | ConnectionStatus::Disabled => {}
            }
        }
        summary
    }
}
