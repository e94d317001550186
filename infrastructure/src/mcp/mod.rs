//! Capability-provider client.
//!
//! Talks JSON-RPC (`tools/list`, `tools/call`) to external providers over two
//! transports:
//!
//! - [`stdio`]: one short-lived subprocess per request
//! - [`http`]: POST with plain-JSON or event-stream responses and optional
//!   session affinity
//!
//! [`McpManager`] ties them together behind the
//! [`CapabilitySource`](toolhost_application::ports::capability_source::CapabilitySource) port.

pub mod error;
pub mod framing;
pub mod http;
pub mod manager;
pub mod protocol;
pub mod stdio;

#[cfg(test)]
pub(crate) mod test_server;

pub use error::McpError;
pub use manager::McpManager;
