//! Completion client port
//!
//! Defines the interface for asking a language model for the next message.
//! The client itself is a black box to this crate; only the subagent use case
//! consumes it.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use toolhost_domain::session::{Completion, Message};

/// Errors that can occur during a completion request
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Input of a completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Function-calling definitions (`{"type":"function","function":{..}}`)
    pub tools: Vec<Value>,
}

/// Client for a tool-calling completion API
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}
