//! Data-URI decoding
//!
//! Accepts `data:<type>/<subtype>;<encoding>,<payload>`. Only the `base64` encoding is
//! supported. The header is matched separately from the payload so large uploads are
//! never scanned by the pattern.

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use regex::Regex;
use std::sync::LazyLock;

static HEADER_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^data:([\w-]+/[\w.+-]+);(\w+)$"));

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Empty data URI")]
    Empty,

    #[error("Malformed data URI")]
    Malformed,

    #[error("Unsupported data URI encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Data URI pattern failed to compile: {0}")]
    Pattern(String),
}

/// Raw bytes and the media type the client declared for them.
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    /// Lowercased MIME type from the URI header.
    pub media_type: String,
    pub bytes: Bytes,
}

impl DecodedUpload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn decode_data_uri(input: &str) -> Result<DecodedUpload, DecodeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DecodeError::Empty);
    }

    let (header, payload) = input.split_once(',').ok_or(DecodeError::Malformed)?;
    if payload.is_empty() {
        return Err(DecodeError::Malformed);
    }

    let pattern = HEADER_PATTERN
        .as_ref()
        .map_err(|e| DecodeError::Pattern(e.to_string()))?;
    let captures = pattern.captures(header).ok_or(DecodeError::Malformed)?;

    let media_type = captures[1].to_lowercase();
    let encoding = &captures[2];
    if !encoding.eq_ignore_ascii_case("base64") {
        return Err(DecodeError::UnsupportedEncoding(encoding.to_string()));
    }

    let bytes = general_purpose::STANDARD.decode(payload)?;

    tracing::debug!(
        media_type = %media_type,
        size = bytes.len(),
        "Decoded data URI"
    );

    Ok(DecodedUpload {
        media_type,
        bytes: Bytes::from(bytes),
    })
}
