//! Application layer for toolhost
//!
//! This crate contains the event bus, port definitions, the human-sync gate
//! and the use cases (capability discovery, subagent runs).
//! It depends only on the domain layer.

pub mod bus;
pub mod config;
pub mod human_sync;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use bus::{BusEvent, EventBus, EventDefinition, Subscription};
pub use config::ExecutionParams;
pub use human_sync::{GateError, HumanSyncGate, PermissionGate, QuestionGate};
pub use ports::{
    capability_source::CapabilitySource,
    completion_client::{CompletionClient, CompletionError, CompletionRequest},
    credentials::{CredentialSource, Credentials, StaticCredentials},
    tool_executor::ToolExecutorPort,
};
pub use use_cases::capability_discovery::{CapabilityDiscovery, CatalogMatch};
pub use use_cases::run_subagent::{
    RunSubagentInput, RunSubagentUseCase, SubagentError, SubagentOutput,
};
