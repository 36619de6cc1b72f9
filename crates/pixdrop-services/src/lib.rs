//! Pixdrop Services Layer
//!
//! Business services sitting between the HTTP layer and storage: the upload ingestion
//! pipeline and the retention sweeper. The API crate depends on this crate as its single
//! service facade.

pub mod cleanup;
pub mod upload;

pub use cleanup::{CleanupService, SweepError, SweepReport};
pub use pixdrop_processing::{ImageTranscoder, UploadValidator};
pub use pixdrop_storage::{
    is_stored_filename, LocalStorage, MetadataStore, Storage, StorageError, StorageResult,
};
pub use upload::{StoredUpload, UploadError, UploadService};
