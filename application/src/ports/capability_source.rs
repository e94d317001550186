//! Capability source port
//!
//! The discovery layer and the model-facing capability tools reach external
//! providers through this port. The provider manager in the infrastructure
//! layer is the production implementation.

use async_trait::async_trait;
use serde_json::Value;
use toolhost_domain::providers::{ConnectionSummary, ProviderName, ProviderState};
use toolhost_domain::tool::value_objects::ToolResult;

#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Run (or join) lazy initialization of every provider
    async fn ensure_initialized(&self);

    /// Current state of every configured provider
    async fn provider_states(&self) -> Vec<ProviderState>;

    /// Invoke `tool` on `provider`; failures are failed results
    async fn call_tool(&self, provider: ProviderName, tool: &str, args: Value) -> ToolResult;

    /// Provider that advertises `tool`, if any
    async fn find_tool_server(&self, tool: &str) -> Option<ProviderName>;

    async fn connection_summary(&self) -> ConnectionSummary;
}
