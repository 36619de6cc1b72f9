//! Pixdrop Core Library
//!
//! This crate provides the domain model, error types, configuration and constants
//! shared across all Pixdrop components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::ImageKind;
