//! Application-level configuration.
//!
//! - [`ExecutionParams`]: timeouts and loop limits shared by the use cases

pub mod execution_params;

pub use execution_params::{ExecutionParams, HANDLER_GRACE};
