//! Stdio transport: one short-lived process per request.
//!
//! The provider command is spawned with the API key injected into its
//! environment, receives one JSON-RPC request line on stdin, and must print
//! the response as its last non-empty stdout line before exiting. No process
//! outlives the call.

use super::error::{McpError, Result};
use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use toolhost_domain::providers::{RuntimeRequirement, TransportConfig};
use toolhost_domain::util::truncate_str;
use tracing::{debug, warn};

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const RAW_PREVIEW_LEN: usize = 500;

#[derive(Debug, Clone)]
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    credential_env: String,
    runtime: Option<RuntimeRequirement>,
}

impl StdioTransport {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        credential_env: impl Into<String>,
        runtime: Option<RuntimeRequirement>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            env,
            credential_env: credential_env.into(),
            runtime,
        }
    }

    /// Build from a stdio transport config; `None` for other transports.
    pub fn from_config(config: &TransportConfig) -> Option<Self> {
        match config {
            TransportConfig::Stdio {
                command,
                args,
                env,
                credential_env,
                runtime,
            } => Some(Self::new(
                command.clone(),
                args.clone(),
                env.clone(),
                credential_env.clone(),
                runtime.clone(),
            )),
            TransportConfig::Http { .. } => None,
        }
    }

    /// Resolve the executable and verify the runtime version.
    pub async fn check_available(&self) -> Result<PathBuf> {
        let path = resolve(&self.command)?;
        if let Some(requirement) = &self.runtime {
            check_runtime(requirement).await?;
        }
        Ok(path)
    }

    /// Run one request/response exchange.
    pub async fn call(
        &self,
        request: &JsonRpcRequest,
        api_key: &str,
        timeout: Duration,
    ) -> Result<JsonRpcResponse> {
        debug!(command = %self.command, method = %request.method, "Spawning provider process");

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .envs(&self.env)
            .env(&self.credential_env, api_key)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        let stdin = child.stdin.take();

        // The write shares the deadline with the exit; a provider that never
        // reads a large request must not stall the call.
        let exchange = async move {
            let write = async move {
                if let Some(mut stdin) = stdin
                    && let Err(e) = stdin.write_all(line.as_bytes()).await
                {
                    debug!(error = %e, "Provider process did not read its request");
                }
            };
            let ((), output) = tokio::join!(write, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| McpError::Timeout(timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output
                .status
                .code()
                .map(|c| format!("code {}", c))
                .unwrap_or_else(|| "a signal".to_string());
            warn!(command = %self.command, %code, "Provider process failed");
            return Err(McpError::ProcessFailed {
                code,
                stderr: if stderr.is_empty() {
                    "(no stderr output)".to_string()
                } else {
                    stderr
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let last = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(McpError::EmptyOutput)?;

        serde_json::from_str(last).map_err(|e| McpError::ParseError {
            error: e.to_string(),
            raw: truncate_str(last, RAW_PREVIEW_LEN).to_string(),
        })
    }
}

fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| McpError::ExecutableNotFound(program.to_string()))
}

async fn check_runtime(requirement: &RuntimeRequirement) -> Result<()> {
    let path = resolve(&requirement.program)?;
    let output = tokio::time::timeout(
        VERSION_CHECK_TIMEOUT,
        Command::new(path).arg("--version").kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| McpError::Timeout(VERSION_CHECK_TIMEOUT.as_secs()))??;

    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match parse_major_version(&found) {
        Some(major) if major >= requirement.min_major => Ok(()),
        _ => Err(McpError::RuntimeTooOld {
            program: requirement.program.clone(),
            found: if found.is_empty() { "(unknown version)".to_string() } else { found },
            required: requirement.min_major,
        }),
    }
}

/// Major version of strings like `v20.11.1` or `18`.
pub fn parse_major_version(version: &str) -> Option<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> StdioTransport {
        StdioTransport::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            BTreeMap::from([("PROVIDER_MODE".to_string(), "test".to_string())]),
            "PROVIDER_KEY",
            None,
        )
    }

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("v20.11.1"), Some(20));
        assert_eq!(parse_major_version("18\n"), Some(18));
        assert_eq!(parse_major_version("node"), None);
    }

    #[tokio::test]
    async fn test_call_uses_last_stdout_line_and_injects_env() {
        let transport = sh(
            r#"read line; echo "booting"; echo "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"$PROVIDER_KEY/$PROVIDER_MODE\"}]}}""#,
        );

        let response = transport
            .call(&JsonRpcRequest::list_tools(), "secret", Duration::from_secs(10))
            .await
            .unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result["content"][0]["text"], "secret/test");
    }

    #[tokio::test]
    async fn test_call_receives_request_line() {
        // Echo the request method back as text
        let transport = sh(
            r#"read line; m=$(echo "$line" | sed 's/.*"method":"\([^"]*\)".*/\1/'); echo "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"$m\"}]}}""#,
        );

        let response = transport
            .call(
                &JsonRpcRequest::call_tool("analyze_image", serde_json::json!({})),
                "k",
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        assert_eq!(response.into_result().unwrap()["content"][0]["text"], "tools/call");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let transport = sh("echo 'model quota exceeded' >&2; exit 3");
        let err = transport
            .call(&JsonRpcRequest::list_tools(), "k", Duration::from_secs(10))
            .await
            .unwrap_err();

        match err {
            McpError::ProcessFailed { code, stderr } => {
                assert_eq!(code, "code 3");
                assert_eq!(stderr, "model quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output() {
        let transport = sh("read line; exit 0");
        let err = transport
            .call(&JsonRpcRequest::list_tools(), "k", Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let transport = sh("sleep 5");
        let err = transport
            .call(&JsonRpcRequest::list_tools(), "k", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unread_large_request_still_times_out() {
        let transport = sh("sleep 4");
        let image = "A".repeat(512 * 1024);
        let request = JsonRpcRequest::call_tool("analyze_image", serde_json::json!({"image": image}));

        let started = std::time::Instant::now();
        let err = transport
            .call(&request, "k", Duration::from_millis(300))
            .await
            .unwrap_err();

        assert!(matches!(err, McpError::Timeout(_)), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let transport = StdioTransport::new(
            "toolhost-no-such-binary-4711",
            Vec::new(),
            BTreeMap::new(),
            "KEY",
            None,
        );
        let err = transport.check_available().await.unwrap_err();
        assert!(err.to_string().contains("toolhost-no-such-binary-4711"));
    }

    #[tokio::test]
    async fn test_runtime_requirement_not_met() {
        let transport = StdioTransport::new(
            "sh",
            Vec::new(),
            BTreeMap::new(),
            "KEY",
            Some(RuntimeRequirement {
                program: "toolhost-no-such-runtime-4711".to_string(),
                min_major: 18,
            }),
        );
        assert!(matches!(
            transport.check_available().await,
            Err(McpError::ExecutableNotFound(_))
        ));
    }
}
