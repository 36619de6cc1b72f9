//! Pixdrop Storage Library
//!
//! Storage abstraction for uploaded images plus the JSON metadata document that records
//! when each file was uploaded.
//!
//! # Storage key format
//!
//! Keys are flat filenames inside the upload directory: `<32 lowercase hex>.<ext>`.
//! Keys must not contain path separators or `..`.

pub mod local;
pub mod metadata;
pub mod names;
pub mod traits;

pub use local::LocalStorage;
pub use metadata::{MetadataError, MetadataGuard, MetadataResult, MetadataStore, UploadIndex};
pub use names::{generate_filename, is_stored_filename, random_filename};
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
