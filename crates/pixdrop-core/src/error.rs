//! Error types module
//!
//! All failures that can reach a client are unified under [`AppError`]. Each variant
//! self-describes its HTTP presentation through [`ErrorMetadata`].
//!
//! Every client-input error is answered with status 404. Existing clients depend on that
//! code, so it is kept even though 400 would be the conventional choice.

use crate::constants::MAX_UPLOAD_BYTES;
use crate::models::ImageKind;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_INPUT")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether the internal details must stay out of responses
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Request body exceeded the transport limit
    #[error("Request body too large: {0}")]
    BodyTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Metadata store error: {0}")]
    MetadataStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (404, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (404, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::UnsupportedMediaType(_) => {
            (404, "UNSUPPORTED_MEDIA_TYPE", false, LogLevel::Debug)
        }
        AppError::BodyTooLarge(_) => (413, "BODY_TOO_LARGE", false, LogLevel::Warn),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::MetadataStore(_) => (500, "METADATA_STORE_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for logs
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::BodyTooLarge(_) => "BodyTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::MetadataStore(_) => "MetadataStore",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(_) => "Invalid data.uri.".to_string(),
            AppError::PayloadTooLarge(_) => format!(
                "File too large. Maximum size is {}MB.",
                MAX_UPLOAD_BYTES / 1024 / 1024
            ),
            AppError::UnsupportedMediaType(_) => format!(
                "Unsupported file type. Allowed types: {}.",
                ImageKind::allowed_mime_types()
            ),
            AppError::BodyTooLarge(_) => "Request body too large.".to_string(),
            AppError::NotFound(_) => "File not found.".to_string(),
            AppError::MetadataStore(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => "Internal server error.".to_string(),
        }
    }
}
