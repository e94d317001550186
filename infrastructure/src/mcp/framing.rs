//! Response body framing.
//!
//! HTTP providers answer either with a bare JSON-RPC object or with an
//! event stream:
//!
//! ```text
//! id:1
//! event:message
//! data:{"jsonrpc":"2.0","id":1,"result":{...}}
//! ```
//!
//! The `Content-Type` header decides first; without one, the first non-blank
//! line of the body is sniffed.

use super::error::McpError;
use super::protocol::JsonRpcResponse;
use toolhost_domain::util::truncate_str;

const RAW_PREVIEW_LEN: usize = 500;
const SSE_FIELDS: &[&str] = &["data:", "event:", "id:", "retry:", ":"];

/// Body framing of a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Json,
    EventStream,
}

impl Framing {
    pub fn detect(content_type: Option<&str>, body: &str) -> Self {
        if let Some(ct) = content_type {
            let ct = ct.to_ascii_lowercase();
            if ct.starts_with("text/event-stream") {
                return Framing::EventStream;
            }
            if ct.contains("json") {
                return Framing::Json;
            }
        }
        sniff(body)
    }
}

fn sniff(body: &str) -> Framing {
    let first = body.lines().map(str::trim).find(|l| !l.is_empty());
    match first {
        Some(line) if !line.starts_with('{') && SSE_FIELDS.iter().any(|f| line.starts_with(f)) => {
            Framing::EventStream
        }
        _ => Framing::Json,
    }
}

/// Decode a response body into a JSON-RPC envelope.
pub fn decode_response(content_type: Option<&str>, body: &str) -> Result<JsonRpcResponse, McpError> {
    match Framing::detect(content_type, body) {
        Framing::Json => parse_envelope(body.trim()),
        Framing::EventStream => decode_event_stream(body),
    }
}

/// The last event whose data is a JSON-RPC response envelope.
fn decode_event_stream(body: &str) -> Result<JsonRpcResponse, McpError> {
    let mut found = None;
    for data in event_payloads(body) {
        if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&data)
            && response.is_envelope()
        {
            found = Some(response);
        }
    }
    found.ok_or_else(|| McpError::ParseError {
        error: "event stream carried no JSON-RPC response".to_string(),
        raw: truncate_str(body, RAW_PREVIEW_LEN).to_string(),
    })
}

/// `data:` payloads per event; multi-line data is joined with newlines.
fn event_payloads(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            current.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    events
}

fn parse_envelope(text: &str) -> Result<JsonRpcResponse, McpError> {
    let parse_error = |error: String| McpError::ParseError {
        error,
        raw: truncate_str(text, RAW_PREVIEW_LEN).to_string(),
    };
    let response: JsonRpcResponse =
        serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    if !response.is_envelope() {
        return Err(parse_error("response has neither result nor error".to_string()));
    }
    Ok(response)
}
