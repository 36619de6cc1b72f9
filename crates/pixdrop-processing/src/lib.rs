//! Upload payload processing: data-URI decoding, validation and lossy re-encoding.

pub mod data_uri;
pub mod transcoder;
pub mod validator;

pub use data_uri::{decode_data_uri, DecodeError, DecodedUpload};
pub use transcoder::{detect_kind, transcode, transcode_blocking, ImageTranscoder, TranscodeOutcome};
pub use validator::{validate_upload, UploadValidator, ValidationError};
