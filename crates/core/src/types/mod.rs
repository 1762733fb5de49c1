//! Core type definitions for xs.
//!
//! Broken down into submodules by concern.

pub mod message;
pub mod request;
pub mod response;
pub mod scenario;
pub mod tool;

pub use message::*;
pub use request::*;
pub use response::*;
pub use scenario::*;
pub use tool::*;
