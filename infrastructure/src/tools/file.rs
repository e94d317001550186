//! File operation tools: read_file, write_file

use super::registry::{HandlerResult, ToolRegistry};
use super::{optional_u64, required_str};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Instant;
use toolhost_domain::tool::{
    entities::{ToolDefinition, ToolOptions},
    schema::{Field, Schema},
    value_objects::{ToolError, ToolResult},
};

/// Tool name constants
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        READ_FILE,
        "Read the contents of a file at the specified path",
        Schema::new()
            .field(Field::string("path", "Path to the file to read").required())
            .field(Field::integer("offset", "Line number to start reading from (0-indexed)"))
            .field(Field::integer("limit", "Maximum number of lines to read")),
    )
}

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE,
        "Write content to a file at the specified path. Creates the file if it doesn't exist, or overwrites if it does.",
        Schema::new()
            .field(Field::string("path", "Path to the file to write").required())
            .field(Field::string("content", "Content to write to the file").required())
            .field(Field::boolean(
                "create_dirs",
                "Create parent directories if they don't exist",
            )),
    )
    .with_options(ToolOptions::new().high_risk())
}

pub fn register(registry: &ToolRegistry) {
    registry.define(read_file_definition(), read_file);
    registry.define(write_file_definition(), write_file);
}

async fn read_file(input: Value) -> HandlerResult {
    let start = Instant::now();
    let path_str = required_str(&input, "path")?;
    let path = Path::new(path_str);

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(path_str, e))?;
    if !metadata.is_file() {
        return Err(ToolError::validation(format!("'{}' is not a file", path_str)));
    }
    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolError::validation(format!(
            "File too large ({} bytes). Maximum size is {} bytes",
            metadata.len(),
            MAX_READ_SIZE
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path_str, e))?;

    let offset = optional_u64(&input, "offset").unwrap_or(0) as usize;
    let limit = optional_u64(&input, "limit").map(|l| l as usize);

    let output = if offset > 0 || limit.is_some() {
        let lines: Vec<&str> = content.lines().collect();
        let end = limit
            .map(|l| offset.saturating_add(l))
            .unwrap_or(lines.len())
            .min(lines.len());
        if offset >= end {
            String::new()
        } else {
            lines[offset..end].join("\n")
        }
    } else {
        content
    };

    let bytes = output.len();
    Ok(ToolResult::success(output).with_metadata(json!({
        "path": path_str,
        "bytes": bytes,
        "duration_ms": start.elapsed().as_millis() as u64,
    })))
}

async fn write_file(input: Value) -> HandlerResult {
    let start = Instant::now();
    let path_str = required_str(&input, "path")?;
    let content = required_str(&input, "content")?;
    let path = Path::new(path_str);

    let create_dirs = input["create_dirs"].as_bool().unwrap_or(false);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if create_dirs {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::execution(format!("Failed to create parent directories: {}", e))
            })?;
        } else if !parent.exists() {
            return Err(ToolError::not_found(format!(
                "Parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| io_error(path_str, e))?;

    let bytes = content.len();
    Ok(
        ToolResult::success(format!("Successfully wrote {} bytes to {}", bytes, path_str))
            .with_metadata(json!({
                "path": path_str,
                "bytes": bytes,
                "duration_ms": start.elapsed().as_millis() as u64,
            })),
    )
}

fn io_error(path: &str, e: std::io::Error) -> ToolError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::not_found(format!("File not found: {}", path)),
        std::io::ErrorKind::PermissionDenied => {
            ToolError::policy(format!("Permission denied: {}", path))
        }
        _ => ToolError::execution(format!("I/O error on {}: {}", path, e)),
    }
}
