use crate::data_uri::DecodedUpload;
use pixdrop_core::constants::MAX_UPLOAD_BYTES;
use pixdrop_core::ImageKind;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported media type: {media_type} (allowed: {allowed})")]
    UnsupportedMediaType { media_type: String, allowed: String },
}

/// Size and type checks applied to every decoded upload.
///
/// The size cap is checked before the media type.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate_media_type(&self, media_type: &str) -> Result<ImageKind, ValidationError> {
        ImageKind::from_mime(media_type).ok_or_else(|| ValidationError::UnsupportedMediaType {
            media_type: media_type.to_string(),
            allowed: ImageKind::allowed_mime_types(),
        })
    }

    /// Returns the declared kind when the upload passes both checks.
    pub fn validate(&self, upload: &DecodedUpload) -> Result<ImageKind, ValidationError> {
        self.validate_file_size(upload.len())?;
        self.validate_media_type(&upload.media_type)
    }
}

/// Validate against the default 15 MiB cap and image allow-list.
pub fn validate_upload(upload: &DecodedUpload) -> Result<ImageKind, ValidationError> {
    UploadValidator::default().validate(upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload(media_type: &str, len: usize) -> DecodedUpload {
        DecodedUpload {
            media_type: media_type.to_string(),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn test_accepts_allowed_types() {
        assert_eq!(validate_upload(&upload("image/png", 10)).unwrap(), ImageKind::Png);
        assert_eq!(validate_upload(&upload("image/jpeg", 10)).unwrap(), ImageKind::Jpeg);
        assert_eq!(validate_upload(&upload("image/webp", 10)).unwrap(), ImageKind::WebP);
    }

    #[test]
    fn test_exact_limit_is_accepted() {
        assert!(validate_upload(&upload("image/png", MAX_UPLOAD_BYTES)).is_ok());
    }

    #[test]
    fn test_one_byte_over_limit_is_rejected() {
        let result = validate_upload(&upload("image/png", MAX_UPLOAD_BYTES + 1));
        assert!(matches!(
            result,
            Err(ValidationError::FileTooLarge { size, .. }) if size == MAX_UPLOAD_BYTES + 1
        ));
    }

    #[test]
    fn test_gif_is_unsupported() {
        let result = validate_upload(&upload("image/gif", 10));
        assert!(matches!(
            result,
            Err(ValidationError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn test_size_checked_before_type() {
        let result = validate_upload(&upload("image/gif", MAX_UPLOAD_BYTES + 1));
        assert!(matches!(result, Err(ValidationError::FileTooLarge { .. })));
    }

    #[test]
    fn test_custom_limit() {
        let validator = UploadValidator::new(4);
        assert!(validator.validate(&upload("image/png", 5)).is_err());
        assert_eq!(validator.max_file_size(), 4);
    }
}
