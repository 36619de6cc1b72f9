//! Pixdrop API Library
//!
//! This crate provides the HTTP handlers, middleware, and application setup.

mod handlers;
mod middleware;
mod telemetry;
mod utils;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{HttpAppError, ValidatedJson};
pub use middleware::rate_limit::HttpRateLimiter;
