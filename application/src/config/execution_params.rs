//! Execution parameters: timeouts and loop control.
//!
//! Every external wait in the tool-execution core is bounded by one of these
//! values.
//!
//! | Parameter | Bounds | Default |
//! |-----------|--------|---------|
//! | `health_check_timeout` | provider `tools/list` probe | 10 s |
//! | `tool_call_timeout` | provider `tools/call` round-trip | 60 s |
//! | `default_tool_timeout` | registry handlers without their own timeout | 120 s |
//! | `human_sync_timeout` | question / permission gate wait | 300 s |
//! | `subagent_max_iterations` | completion calls per subagent run | 15 |
//!
//! Tools that wait on one of these bounds get a registry deadline derived from
//! it, so the inner wait always fires first.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolhost_domain::subagent::DEFAULT_MAX_ITERATIONS;

/// Headroom between an inner deadline and the registry deadline around it.
pub const HANDLER_GRACE: Duration = Duration::from_secs(5);

/// Timeouts and loop limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub health_check_timeout: Duration,
    pub tool_call_timeout: Duration,
    pub default_tool_timeout: Duration,
    pub human_sync_timeout: Duration,
    pub subagent_max_iterations: usize,
    /// Model name passed to the completion client for subagents
    pub subagent_model: String,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            health_check_timeout: Duration::from_secs(10),
            tool_call_timeout: Duration::from_secs(60),
            default_tool_timeout: Duration::from_secs(120),
            human_sync_timeout: Duration::from_secs(300),
            subagent_max_iterations: DEFAULT_MAX_ITERATIONS,
            subagent_model: "glm-4.6".to_string(),
        }
    }
}

impl ExecutionParams {
    /// Registry deadline for a provider call: initialization, the call, one
    /// session refresh probe and one retry.
    pub fn capability_call_timeout(&self) -> Duration {
        self.tool_call_timeout * 2 + self.health_check_timeout * 2 + HANDLER_GRACE
    }

    /// Registry deadline for a tool that waits on a human-sync gate.
    pub fn human_sync_tool_timeout(&self) -> Duration {
        self.human_sync_timeout + HANDLER_GRACE
    }

    // ==================== Builder Methods ====================

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    pub fn with_tool_call_timeout(mut self, timeout: Duration) -> Self {
        self.tool_call_timeout = timeout;
        self
    }

    pub fn with_default_tool_timeout(mut self, timeout: Duration) -> Self {
        self.default_tool_timeout = timeout;
        self
    }

    pub fn with_human_sync_timeout(mut self, timeout: Duration) -> Self {
        self.human_sync_timeout = timeout;
        self
    }

    pub fn with_subagent_max_iterations(mut self, max: usize) -> Self {
        self.subagent_max_iterations = max;
        self
    }

    pub fn with_subagent_model(mut self, model: impl Into<String>) -> Self {
        self.subagent_model = model.into();
        self
    }
}
