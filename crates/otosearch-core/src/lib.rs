//! Core types and utilities for the Otosearch car recognition service.
//!
//! This crate provides the foundational pieces shared by the vision
//! pipeline, the specification store and the binaries: the error type,
//! pipeline configuration and the class-label table.

pub mod config;
pub mod error;
pub mod labels;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use labels::ClassLabels;

/// Number of candidate predictions returned per image.
pub const TOP_K: usize = 3;

/// Default model input size (square, pixels).
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
