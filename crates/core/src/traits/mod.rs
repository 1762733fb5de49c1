//! Core traits for xs.
//!
//! Traits are organized by layer:
//! - `pipeline`: scenario pipelines (Pipeline)
//! - `skills`: tools (Tool, ToolRegistry)
//! - `llm`: model gateway (ModelClient)

pub mod llm;
pub mod pipeline;
pub mod skills;

pub use llm::*;
pub use pipeline::*;
pub use skills::*;
