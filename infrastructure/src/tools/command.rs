//! Command execution tool: run_command
//!
//! Every output line is also emitted on the bus as `process.output.<pid>`
//! with payload `{"stream": "stdout" | "stderr", "line": ...}`.

use super::registry::{HandlerResult, ToolRegistry};
use super::{optional_u64, required_str};
use serde_json::{Value, json};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use toolhost_application::bus::{EventBus, topics};
use toolhost_domain::tool::{
    entities::{ToolDefinition, ToolOptions},
    schema::{Field, Schema},
    value_objects::{ToolError, ToolResult},
};
use tracing::debug;

/// Tool name constant
pub const RUN_COMMAND: &str = "run_command";

/// Default timeout for command execution (60 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

pub fn run_command_definition() -> ToolDefinition {
    ToolDefinition::new(
        RUN_COMMAND,
        "Execute a shell command and return its output. Use with caution.",
        Schema::new()
            .field(Field::string("command", "The command to execute").required())
            .field(Field::string("working_dir", "Working directory for the command"))
            .field(Field::integer("timeout_secs", "Timeout in seconds (default: 60)")),
    )
    .with_options(ToolOptions::new().high_risk())
}

pub fn register(registry: &ToolRegistry, bus: Arc<EventBus>) {
    registry.define(run_command_definition(), move |input: Value| {
        run_command(input, bus.clone())
    });
}

async fn run_command(input: Value, bus: Arc<EventBus>) -> HandlerResult {
    let start = Instant::now();
    let command = required_str(&input, "command")?;
    let timeout_secs = optional_u64(&input, "timeout_secs").unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };

    if let Some(dir) = input["working_dir"].as_str() {
        let path = Path::new(dir);
        if !path.is_dir() {
            return Err(ToolError::not_found(format!(
                "Working directory does not exist: {}",
                dir
            )));
        }
        cmd.current_dir(path);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ToolError::execution(format!("Failed to spawn command: {}", e)))?;
    let process_id = child.id().unwrap_or_default();
    let topic = topics::process_output(process_id);
    debug!(command, process_id, "Command started");

    let stdout = pump(child.stdout.take(), "stdout", bus.clone(), topic.clone());
    let stderr = pump(child.stderr.take(), "stderr", bus, topic);

    let run = async {
        let (stdout, stderr) = tokio::join!(stdout, stderr);
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };

    let (status, stdout, stderr) =
        match tokio::time::timeout(Duration::from_secs(timeout_secs), run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::execution(format!(
                    "Failed to wait for process: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(ToolError::timeout(format!(
                    "Command timed out after {} seconds",
                    timeout_secs
                )));
            }
        };

    let exit_code = status.code().unwrap_or(-1);

    let mut combined = stdout;
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&stderr);
    }
    if combined.len() > MAX_OUTPUT_SIZE {
        let cut = toolhost_domain::util::truncate_str(&combined, MAX_OUTPUT_SIZE).len();
        combined.truncate(cut);
        combined.push_str("\n... (output truncated)");
    }

    let metadata = json!({
        "exit_code": exit_code,
        "process_id": process_id,
        "bytes": combined.len(),
        "duration_ms": start.elapsed().as_millis() as u64,
    });

    // A non-zero exit is still a successful tool run; the caller decides
    let output = if status.success() {
        combined
    } else {
        format!("Command exited with code {}\n{}", exit_code, combined)
    };
    Ok(ToolResult::success(output).with_metadata(metadata))
}

/// Forward each line to the bus and collect it.
async fn pump<R>(reader: Option<R>, stream: &'static str, bus: Arc<EventBus>, topic: String) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        bus.emit(topic.as_str(), json!({"stream": stream, "line": line}));
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}
