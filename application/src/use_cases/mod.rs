//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod capability_discovery;
pub mod run_subagent;
