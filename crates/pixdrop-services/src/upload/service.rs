use chrono::{DateTime, Utc};
use pixdrop_core::{AppError, ImageKind};
use pixdrop_processing::{
    decode_data_uri, detect_kind, transcode_blocking, DecodeError, ImageTranscoder,
    UploadValidator, ValidationError,
};
use pixdrop_storage::{generate_filename, MetadataError, MetadataStore, Storage, StorageError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Decode(e) => AppError::InvalidInput(e.to_string()),
            UploadError::Validation(e @ ValidationError::FileTooLarge { .. }) => {
                AppError::PayloadTooLarge(e.to_string())
            }
            UploadError::Validation(e @ ValidationError::UnsupportedMediaType { .. }) => {
                AppError::UnsupportedMediaType(e.to_string())
            }
            UploadError::Storage(e) => AppError::Storage(e.to_string()),
            UploadError::Metadata(e) => AppError::MetadataStore(e.to_string()),
        }
    }
}

/// A successfully stored upload
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub filename: String,
    pub kind: ImageKind,
    pub size_bytes: usize,
    pub transcoded: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// Ingestion pipeline: decode, validate, transcode, name, write, record.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    metadata: Arc<MetadataStore>,
    validator: UploadValidator,
    transcoder: ImageTranscoder,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>, metadata: Arc<MetadataStore>) -> Self {
        Self {
            storage,
            metadata,
            validator: UploadValidator::default(),
            transcoder: ImageTranscoder::default(),
        }
    }

    pub fn with_validator(mut self, validator: UploadValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_transcoder(mut self, transcoder: ImageTranscoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    #[tracing::instrument(skip(self, data_uri), fields(upload.input_len = data_uri.len()))]
    pub async fn upload(&self, data_uri: &str) -> Result<StoredUpload, UploadError> {
        let decoded = decode_data_uri(data_uri)?;
        let declared = self.validator.validate(&decoded)?;
        let original_size = decoded.len();

        let outcome = transcode_blocking(self.transcoder, decoded.bytes).await;
        let transcoded = outcome.is_transcoded();
        let kind = outcome
            .kind()
            .or_else(|| detect_kind(outcome.bytes()))
            .unwrap_or(declared);
        let bytes = outcome.into_bytes();
        let size_bytes = bytes.len();

        let filename = generate_filename(self.storage.as_ref(), kind).await?;
        self.storage.put_new(&filename, bytes).await?;

        let uploaded_at = Utc::now();
        if let Err(e) = self.metadata.record_upload(&filename, uploaded_at).await {
            // Without a record the sweeper would never reclaim the file.
            if let Err(delete_err) = self.storage.delete(&filename).await {
                tracing::error!(
                    error = %delete_err,
                    filename = %filename,
                    "Failed to remove unrecorded upload"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            filename = %filename,
            declared = %declared,
            kind = %kind,
            original_size,
            size_bytes,
            transcoded,
            "Image uploaded"
        );

        Ok(StoredUpload {
            filename,
            kind,
            size_bytes,
            transcoded,
            uploaded_at,
        })
    }
}
