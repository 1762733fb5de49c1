//! Core types, traits, and error definitions for xs.
//!
//! This crate provides the foundational building blocks shared by the
//! router, the pipelines, the tools and the model clients.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
