//! Interaction domain module: payloads exchanged with the human operator.
//!
//! Two flows suspend a tool call until a person answers:
//!
//! | Flow | Request | Response |
//! |------|---------|----------|
//! | Clarifying question | [`Question`] | [`Answer`] |
//! | Destructive-action approval | [`PermissionRequest`] | [`PermissionDecision`] |
//!
//! Both travel over the same single-slot gate; they differ only in payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A clarifying question the agent asks the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    /// Suggested answers; empty means free-form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Question {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// The user's reply to a [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Request to run a high-risk tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub tool: String,
    /// One-line description shown to the user, e.g. `write_file(src/main.rs)`
    pub summary: String,
    pub input: Value,
}

/// The user's verdict on a [`PermissionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow,
    Deny,
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_serialization_skips_empty_options() {
        let json = serde_json::to_value(Question::new("Which branch?")).unwrap();
        assert_eq!(json, json!({"question": "Which branch?"}));

        let json = serde_json::to_value(Question::new("Proceed?").with_options(["yes", "no"])).unwrap();
        assert_eq!(json["options"], json!(["yes", "no"]));
    }

    #[test]
    fn test_permission_decision() {
        assert!(PermissionDecision::Allow.is_allowed());
        assert!(!PermissionDecision::Deny.is_allowed());
        let decision: PermissionDecision = serde_json::from_value(json!("deny")).unwrap();
        assert_eq!(decision, PermissionDecision::Deny);
    }
}
