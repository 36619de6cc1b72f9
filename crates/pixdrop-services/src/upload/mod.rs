mod service;

pub use service::{StoredUpload, UploadError, UploadService};
