//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod capability_source;
pub mod completion_client;
pub mod credentials;
pub mod tool_executor;
