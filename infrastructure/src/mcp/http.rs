//! HTTP transport: one JSON-RPC request per POST.

use super::error::{McpError, Result};
use super::framing::decode_response;
use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use toolhost_domain::util::truncate_str;
use tracing::{debug, trace};

/// Header carrying the server-issued session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

const ERROR_BODY_PREVIEW: usize = 300;

/// A decoded reply plus the session id the server handed out, if any.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub response: JsonRpcResponse,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `request` and decode the reply, classifying HTTP failures.
    pub async fn send(
        &self,
        request: &JsonRpcRequest,
        api_key: &str,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<HttpReply> {
        debug!(url = %self.url, method = %request.method, id = request.id, "Sending provider request");

        let mut builder = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .bearer_auth(api_key)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(request);
        if let Some(id) = session_id {
            builder = builder.header(SESSION_HEADER, id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest(e, timeout))?;

        let status = response.status();
        let headers = response.headers();
        let session_id = header_value(headers, SESSION_HEADER);
        let content_type = header_value(headers, CONTENT_TYPE.as_str());

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest(e, timeout))?;
        trace!(status = status.as_u16(), body_len = body.len(), "Provider response received");

        if !status.is_success() {
            return Err(classify_status(status, &self.url, &body));
        }

        let response = decode_response(content_type.as_deref(), &body)?;
        Ok(HttpReply {
            response,
            session_id,
        })
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn classify_reqwest(err: reqwest::Error, timeout: Duration) -> McpError {
    if err.is_timeout() {
        McpError::Timeout(timeout.as_secs())
    } else {
        McpError::Network(err.to_string())
    }
}

/// Map a non-2xx status to an error.
pub fn classify_status(status: StatusCode, url: &str, body: &str) -> McpError {
    let message = truncate_str(body.trim(), ERROR_BODY_PREVIEW).to_string();
    match status.as_u16() {
        code @ (401 | 403) => McpError::Unauthorized {
            status: code,
            message,
        },
        404 => McpError::NotFound {
            url: url.to_string(),
        },
        code @ 500..=599 => McpError::Server {
            status: code,
            message,
        },
        code => McpError::Http {
            status: code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::test_server::{StubReply, StubServer};
    use serde_json::json;

    #[test]
    fn test_classify_status() {
        let url = "https://api.example.test/mcp";
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, url, "nope"),
            McpError::Unauthorized { status: 403, .. }
        ));
        assert!(classify_status(StatusCode::NOT_FOUND, url, "").to_string().contains(url));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, url, "upstream"),
            McpError::Server { status: 502, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, url, "slow down"),
            McpError::Http { status: 429, .. }
        ));
    }

    #[tokio::test]
    async fn test_send_captures_session_and_decodes_event_stream() {
        let server = StubServer::start(|_req| {
            StubReply::event_stream(json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}))
                .with_header(SESSION_HEADER, "sess-1")
        })
        .await;

        let transport = HttpTransport::new(reqwest::Client::new(), server.url());
        let reply = transport
            .send(&JsonRpcRequest::list_tools(), "key", None, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(reply.session_id.as_deref(), Some("sess-1"));
        assert_eq!(reply.response.result.unwrap(), json!({"tools": []}));

        let recorded = server.requests();
        assert_eq!(recorded[0].header("authorization").as_deref(), Some("Bearer key"));
        assert_eq!(recorded[0].body["method"], "tools/list");
    }

    #[tokio::test]
    async fn test_send_resends_session_id() {
        let server = StubServer::start(|_req| {
            StubReply::json(json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
        })
        .await;

        let transport = HttpTransport::new(reqwest::Client::new(), server.url());
        transport
            .send(
                &JsonRpcRequest::list_tools(),
                "key",
                Some("sess-9"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(
            server.requests()[0].header(SESSION_HEADER).as_deref(),
            Some("sess-9")
        );
    }

    #[tokio::test]
    async fn test_send_404_mentions_url() {
        let server = StubServer::start(|_req| StubReply::status(404, "not here")).await;
        let transport = HttpTransport::new(reqwest::Client::new(), server.url());

        let err = transport
            .send(&JsonRpcRequest::list_tools(), "key", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains(&server.url()));
    }
}
