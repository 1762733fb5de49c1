//! Governance for xs.
//!
//! This crate provides:
//! - Logging setup
//! - Input guardrails (length limits, script injection patterns)
//! - Image file validation shared by the CLI and the tools

pub mod guardrails;
pub mod tracing_layer;

pub use guardrails::{
    validate_filename, validate_image_file, GuardrailResult, InputGuardrail, ViolationType,
};
pub use tracing_layer::configure_tracing;
