//! Search tools: list_files, grep_search
//!
//! Both walk the filesystem synchronously, so they run on the blocking pool.

use super::registry::{HandlerResult, ToolRegistry};
use super::{optional_u64, required_str};
use glob::glob;
use regex::Regex;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use toolhost_domain::tool::{
    entities::ToolDefinition,
    schema::{Field, Schema},
    value_objects::{ToolError, ToolResult},
};

/// Tool name constants
pub const LIST_FILES: &str = "list_files";
pub const GREP_SEARCH: &str = "grep_search";

/// Maximum number of results to return
const MAX_RESULTS: usize = 1000;

/// Maximum file size for grep (5 MB)
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

pub fn list_files_definition() -> ToolDefinition {
    ToolDefinition::new(
        LIST_FILES,
        "List files matching a glob pattern (e.g., '**/*.rs', 'src/*.txt')",
        Schema::new()
            .field(Field::string("pattern", "Glob pattern to match files").required())
            .field(Field::string(
                "base_dir",
                "Base directory to search from (default: current dir)",
            ))
            .field(Field::integer(
                "max_results",
                "Maximum number of results to return (default: 1000)",
            )),
    )
}

pub fn grep_search_definition() -> ToolDefinition {
    ToolDefinition::new(
        GREP_SEARCH,
        "Search for a pattern within file contents using regex",
        Schema::new()
            .field(Field::string("pattern", "Regex pattern to search for").required())
            .field(Field::string("path", "File or directory to search in").required())
            .field(Field::string(
                "file_pattern",
                "Glob pattern to filter files (e.g., '*.rs')",
            ))
            .field(Field::integer(
                "context_lines",
                "Number of context lines before and after match",
            ))
            .field(Field::boolean(
                "case_insensitive",
                "Perform case-insensitive search",
            )),
    )
}

pub fn register(registry: &ToolRegistry) {
    registry.define(list_files_definition(), |input: Value| blocking(input, list_files));
    registry.define(grep_search_definition(), |input: Value| blocking(input, grep_search));
}

async fn blocking(input: Value, f: fn(&Value) -> HandlerResult) -> HandlerResult {
    tokio::task::spawn_blocking(move || f(&input))
        .await
        .map_err(|e| ToolError::execution(format!("Search task failed: {}", e)))?
}

fn list_files(input: &Value) -> HandlerResult {
    let start = Instant::now();
    let pattern = required_str(input, "pattern")?;
    let base_dir = input["base_dir"].as_str().unwrap_or(".");
    let max_results = optional_u64(input, "max_results")
        .map(|n| n as usize)
        .unwrap_or(MAX_RESULTS)
        .min(MAX_RESULTS);

    let full_pattern = if pattern.starts_with('/') || pattern.starts_with("./") {
        pattern.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), pattern)
    };

    let entries = glob(&full_pattern)
        .map_err(|e| ToolError::validation(format!("Invalid glob pattern: {}", e)))?;

    let mut results = Vec::new();
    let mut error_count = 0;
    for entry in entries {
        if results.len() >= max_results {
            break;
        }
        match entry {
            Ok(path) => results.push(path.display().to_string()),
            Err(_) => error_count += 1,
        }
    }

    let match_count = results.len();
    let output = if results.is_empty() {
        "No files found matching the pattern".to_string()
    } else {
        let mut output = results.join("\n");
        if match_count >= max_results {
            output.push_str(&format!("\n... (limited to {} results)", max_results));
        }
        if error_count > 0 {
            output.push_str(&format!("\n({} paths could not be accessed)", error_count));
        }
        output
    };

    Ok(ToolResult::success(output).with_metadata(json!({
        "match_count": match_count,
        "duration_ms": start.elapsed().as_millis() as u64,
    })))
}

fn grep_search(input: &Value) -> HandlerResult {
    let start = Instant::now();
    let pattern = required_str(input, "pattern")?;
    let path_str = required_str(input, "path")?;

    let path = Path::new(path_str);
    if !path.exists() {
        return Err(ToolError::not_found(format!("Path not found: {}", path_str)));
    }

    let file_pattern = input["file_pattern"].as_str();
    let context_lines = optional_u64(input, "context_lines").unwrap_or(0) as usize;
    let case_insensitive = input["case_insensitive"].as_bool().unwrap_or(false);

    let regex_pattern = if case_insensitive {
        format!("(?i){}", pattern)
    } else {
        pattern.to_string()
    };
    let regex = Regex::new(&regex_pattern)
        .map_err(|e| ToolError::validation(format!("Invalid regex pattern: {}", e)))?;

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        collect_files(path, file_pattern)
    };

    let mut results = Vec::new();
    let mut total_matches = 0;

    for file_path in files {
        if results.len() >= MAX_RESULTS {
            break;
        }
        if fs::metadata(&file_path).is_ok_and(|m| m.len() > MAX_GREP_FILE_SIZE) {
            continue;
        }
        // Binary and unreadable files are skipped
        let Ok(content) = fs::read_to_string(&file_path) else {
            continue;
        };

        let lines: Vec<&str> = content.lines().collect();
        let file_display = file_path.display().to_string();

        for (line_num, line) in lines.iter().enumerate() {
            if results.len() >= MAX_RESULTS {
                break;
            }
            if !regex.is_match(line) {
                continue;
            }
            total_matches += 1;

            if context_lines > 0 {
                let start_line = line_num.saturating_sub(context_lines);
                let end_line = (line_num + context_lines + 1).min(lines.len());

                let mut block = format!("{}:", file_display);
                for (i, ctx_line) in lines[start_line..end_line].iter().enumerate() {
                    let actual = start_line + i + 1;
                    let marker = if actual == line_num + 1 { ">" } else { " " };
                    block.push_str(&format!("\n{}{}: {}", marker, actual, ctx_line));
                }
                results.push(block);
            } else {
                results.push(format!("{}:{}: {}", file_display, line_num + 1, line));
            }
        }
    }

    let output = if results.is_empty() {
        "No matches found".to_string()
    } else {
        let mut output = results.join("\n");
        if total_matches >= MAX_RESULTS {
            output.push_str(&format!("\n... (limited to {} matches)", MAX_RESULTS));
        }
        output
    };

    Ok(ToolResult::success(output).with_metadata(json!({
        "match_count": total_matches,
        "path": path_str,
        "duration_ms": start.elapsed().as_millis() as u64,
    })))
}

/// Collect files from a directory, optionally filtered by a glob pattern
fn collect_files(dir: &Path, file_pattern: Option<&str>) -> Vec<PathBuf> {
    let pattern = file_pattern.unwrap_or("**/*");
    let full_pattern = format!("{}/{}", dir.display(), pattern);

    let Ok(paths) = glob(&full_pattern) else {
        return Vec::new();
    };
    paths
        .flatten()
        .filter(|entry| entry.is_file())
        .take(MAX_RESULTS)
        .collect()
}
