//! Capability discovery: searchable catalog of provider tools.
//!
//! Provider tool descriptions stay out of the model's context until it asks
//! for them. The model searches the catalog, reads the details of a match,
//! then calls it.

pub mod catalog;
pub mod render;

pub use catalog::{CatalogEntry, MIN_SCORE, SearchHit, search};
pub use render::{compact_tool_list, format_tool_details, generate_example_call};
