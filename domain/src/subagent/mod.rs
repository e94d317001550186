//! Subagent domain module: delegated, tool-restricted conversations.
//!
//! | Kind | Tools | Allowed in plan mode |
//! |------|-------|----------------------|
//! | `explore` | read-only tools and capability lookup | Yes |
//! | `general` | everything except `task` | No |

pub mod profile;

pub use profile::{
    DEFAULT_MAX_ITERATIONS, MAX_ITERATIONS_CEILING, OperatingMode, SubagentKind, ToolAccess,
    effective_max_iterations, summarize_action,
};
