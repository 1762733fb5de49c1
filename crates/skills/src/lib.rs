//! Skills for xs.
//!
//! This crate provides:
//! - Tool registry for managing available tools
//! - Built-in tools (images_reader, ocr_image, create_images, download_video)
//! - Image lookup and OCR output cleanup shared by the tools

pub mod builtin;
pub mod image;
pub mod registry;

pub use builtin::*;
pub use image::{format_ocr_result, resolve_image, READER_EXTENSIONS};
pub use registry::DefaultToolRegistry;
