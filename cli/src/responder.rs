//! Terminal responder for the human-sync gates.
//!
//! Questions and permission requests arrive as bus events; the answer is read
//! from stdin on the blocking pool and handed back to the gate.

use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;
use toolhost_application::bus::{BusEvent, Subscription, topics};
use toolhost_domain::interaction::{Answer, PermissionDecision, PermissionRequest, Question};
use toolhost_infrastructure::ToolHost;
use tracing::warn;

/// Attach stdin/stderr prompts to `host`'s gates.
///
/// With `auto_approve`, permission requests are allowed without a prompt.
pub fn attach(host: &ToolHost, auto_approve: bool) -> Subscription {
    let questions = host.questions.clone();
    let permissions = host.permissions.clone();

    host.bus.subscribe(move |event: &BusEvent| match event.name.as_str() {
        topics::QUESTION_ASKED => {
            let Some(question) = decode::<Question>(&event.payload) else {
                return;
            };
            let questions = Arc::clone(&questions);
            tokio::task::spawn_blocking(move || match prompt(&render_question(&question)) {
                Some(reply) => {
                    questions.resolve(Answer::new(pick_option(&question, reply)));
                }
                None => {
                    questions.reject("no answer on stdin");
                }
            });
        }
        topics::PERMISSION_REQUESTED => {
            if auto_approve {
                permissions.resolve(PermissionDecision::Allow);
                return;
            }
            let Some(request) = decode::<PermissionRequest>(&event.payload) else {
                return;
            };
            let permissions = Arc::clone(&permissions);
            tokio::task::spawn_blocking(move || {
                let reply = prompt(&format!("Allow {}? [y/N] ", request.summary));
                let decision = match reply.as_deref().map(str::trim) {
                    Some("y" | "Y" | "yes") => PermissionDecision::Allow,
                    _ => PermissionDecision::Deny,
                };
                permissions.resolve(decision);
            });
        }
        _ => {}
    })
}

fn decode<T: serde::de::DeserializeOwned>(payload: &Value) -> Option<T> {
    serde_json::from_value(payload.clone())
        .inspect_err(|e| warn!("Undecodable gate event: {}", e))
        .ok()
}

fn render_question(question: &Question) -> String {
    let mut text = format!("\n? {}\n", question.question);
    for (i, option) in question.options.iter().enumerate() {
        text.push_str(&format!("  {}. {}\n", i + 1, option));
    }
    text.push_str("> ");
    text
}

/// A numeric reply within range selects that option.
fn pick_option(question: &Question, reply: String) -> String {
    reply
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i).cloned())
        .unwrap_or(reply)
}

/// Print `text` to stderr and read one line.
fn prompt(text: &str) -> Option<String> {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{}", text);
    let _ = stderr.flush();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}
