//! Subagent kinds, their tool access and the mode policy that gates them.

use crate::util::ellipsize;
use serde::{Deserialize, Serialize};

/// Default cap on completion round-trips in one subagent run.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Hard ceiling; caller-supplied limits are clamped to this.
pub const MAX_ITERATIONS_CEILING: usize = 50;

/// Identifying arguments in action summaries are cut to this many characters.
pub const SUMMARY_ARG_LEN: usize = 50;

const EXPLORE_TOOLS: &[&str] = &[
    "read_file",
    "list_files",
    "grep_search",
    "search_capabilities",
    "describe_capability",
];

/// Subagents may never spawn further subagents.
const GENERAL_DENIED: &[&str] = &["task"];

const EXPLORE_PROMPT: &str = "\
You are an exploration subagent. Investigate the codebase and gather the \
information requested, using only the read-only tools available to you. \
Do not attempt to modify files or run commands. When you have enough \
information, reply with a concise report of your findings, citing file \
paths where relevant.";

const GENERAL_PROMPT: &str = "\
You are a general-purpose subagent working on a delegated task. Use the \
available tools to complete the task end to end. Prefer small, verifiable \
steps. When finished, reply with a short summary of what you did and \
anything the caller needs to know.";

/// Which registered tools a profile may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAccess {
    Only(&'static [&'static str]),
    AllExcept(&'static [&'static str]),
}

impl ToolAccess {
    pub fn permits(&self, tool: &str) -> bool {
        match self {
            ToolAccess::Only(names) => names.contains(&tool),
            ToolAccess::AllExcept(names) => !names.contains(&tool),
        }
    }
}

/// Kind of delegated conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubagentKind {
    /// Read-only investigation
    Explore,
    /// Full access minus subagent spawning
    General,
}

impl SubagentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubagentKind::Explore => "explore",
            SubagentKind::General => "general",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            SubagentKind::Explore => EXPLORE_PROMPT,
            SubagentKind::General => GENERAL_PROMPT,
        }
    }

    pub fn tool_access(&self) -> ToolAccess {
        match self {
            SubagentKind::Explore => ToolAccess::Only(EXPLORE_TOOLS),
            SubagentKind::General => ToolAccess::AllExcept(GENERAL_DENIED),
        }
    }
}

impl std::fmt::Display for SubagentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubagentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explore" => Ok(SubagentKind::Explore),
            "general" | "general-purpose" => Ok(SubagentKind::General),
            _ => Err(format!("Unknown subagent kind '{}'. Available: explore, general", s)),
        }
    }
}

/// Operating mode of the parent agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    #[default]
    Normal,
    /// Planning only: no side effects
    Plan,
    AutoEdit,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Normal => "normal",
            OperatingMode::Plan => "plan",
            OperatingMode::AutoEdit => "auto_edit",
        }
    }

    pub fn permits(&self, kind: SubagentKind) -> bool {
        match self {
            OperatingMode::Plan => kind == SubagentKind::Explore,
            OperatingMode::Normal | OperatingMode::AutoEdit => true,
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a requested iteration cap into `1..=MAX_ITERATIONS_CEILING`.
pub fn effective_max_iterations(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_MAX_ITERATIONS)
        .clamp(1, MAX_ITERATIONS_CEILING)
}

/// One-line action label: `tool(identifying argument)`.
pub fn summarize_action(tool: &str, identifying_arg: Option<&str>) -> String {
    match identifying_arg {
        Some(arg) => format!("{}({})", tool, ellipsize(arg, SUMMARY_ARG_LEN)),
        None => format!("{}()", tool),
    }
}
