//! Event topics published by the tool-execution core.
//!
//! | Topic | Payload | Publisher |
//! |-------|---------|-----------|
//! | `provider.status_changed` | [`ProviderStatusChanged`] | provider manager |
//! | `question.asked` | [`Question`] | question gate |
//! | `permission.requested` | [`PermissionRequest`] | permission gate |
//! | `process.output.<id>` | `{stream, line}` (unvalidated) | `run_command` |

use super::{EventBus, EventDefinition};
use serde::{Deserialize, Serialize};
use toolhost_domain::interaction::{PermissionRequest, Question};
use toolhost_domain::providers::{ConnectionStatus, ProviderName};
use toolhost_domain::tool::schema::{Field, FieldType, Schema};

pub const PROVIDER_STATUS_CHANGED: &str = "provider.status_changed";
pub const QUESTION_ASKED: &str = "question.asked";
pub const PERMISSION_REQUESTED: &str = "permission.requested";
pub const PROCESS_OUTPUT_PREFIX: &str = "process.output";

/// Payload of `provider.status_changed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatusChanged {
    pub provider: ProviderName,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_count: usize,
}

pub fn provider_status_changed() -> EventDefinition<ProviderStatusChanged> {
    EventBus::define(
        PROVIDER_STATUS_CHANGED,
        Schema::new()
            .field(
                Field::string("provider", "Provider name")
                    .required()
                    .one_of(ProviderName::ALL.iter().map(|p| p.as_str())),
            )
            .field(
                Field::string("status", "New connection status")
                    .required()
                    .one_of(["pending", "connected", "failed", "disabled"]),
            )
            .field(Field::string("error", "Failure reason"))
            .field(Field::integer("tool_count", "Known tools").required()),
    )
}

pub fn question_asked() -> EventDefinition<Question> {
    EventBus::define(
        QUESTION_ASKED,
        Schema::new()
            .field(Field::string("question", "Question text").required())
            .field(Field::array("options", FieldType::String, "Suggested answers")),
    )
}

pub fn permission_requested() -> EventDefinition<PermissionRequest> {
    EventBus::define(
        PERMISSION_REQUESTED,
        Schema::new()
            .field(Field::string("tool", "Tool awaiting approval").required())
            .field(Field::string("summary", "One-line description").required())
            .field(Field::new("input", FieldType::Any).describe("Validated tool input")),
    )
}

/// Dynamic topic name for output of process `id`.
pub fn process_output(id: impl std::fmt::Display) -> String {
    format!("{}.{}", PROCESS_OUTPUT_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_topic_payloads_validate() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(move |e| sink.lock().unwrap().push(e.name.clone()));

        bus.publish(
            &provider_status_changed(),
            &ProviderStatusChanged {
                provider: ProviderName::WebSearch,
                status: ConnectionStatus::Failed,
                error: Some("HTTP 404".into()),
                tool_count: 0,
            },
        );
        bus.publish(&question_asked(), &Question::new("Which file?").with_options(["a", "b"]));
        bus.publish(
            &permission_requested(),
            &PermissionRequest {
                tool: "write_file".into(),
                summary: "write_file(a.txt)".into(),
                input: serde_json::json!({"path": "a.txt"}),
            },
        );

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PROVIDER_STATUS_CHANGED, QUESTION_ASKED, PERMISSION_REQUESTED]
        );
    }

    #[test]
    fn test_process_output_topic() {
        assert_eq!(process_output(42), "process.output.42");
    }
}
