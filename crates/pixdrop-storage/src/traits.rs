//! Storage abstraction trait
//!
//! This module defines the Storage trait implemented by the upload directory backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file contents
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Keys are bare filenames. Implementations must refuse keys that could escape the
/// storage root.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write a new file. Fails with [`StorageError::AlreadyExists`] instead of
    /// overwriting an existing one.
    async fn put_new(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Read a whole file
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Read a file as a stream of chunks
    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Delete a file. Returns `false` when there was nothing to delete.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a file exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Size in bytes of a stored file
    async fn content_length(&self, key: &str) -> StorageResult<u64>;
}
