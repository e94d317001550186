//! Conversation types shared with the completion client.

pub mod message;

pub use message::{Choice, Completion, FinishReason, Message, Role, ToolCallRequest};
