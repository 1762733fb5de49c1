//! Scenario pipelines for xs.
//!
//! This crate binds a system role, a toolset and a model client into one
//! pipeline per scenario, and runs the tool loop of each invocation.

pub mod builder;
pub mod pipeline;
pub mod prompts;
pub mod registry;

pub use builder::PipelineBuilder;
pub use pipeline::{AgentPipeline, DirectImage, PipelineConfig};
pub use registry::{build_registry, PipelineRegistry};
