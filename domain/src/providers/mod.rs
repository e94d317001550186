//! Capability-provider model: static configuration and runtime state.

pub mod config;
pub mod state;

pub use config::{ProviderConfig, ProviderName, RuntimeRequirement, TransportConfig};
pub use state::{ConnectionStatus, ConnectionSummary, ProviderState, RemoteTool};
