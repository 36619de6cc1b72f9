//! Lossy re-encoding of uploaded images
//!
//! The actual format is always sniffed from the bytes. PNG is re-encoded losslessly with
//! the strongest compression, JPEG goes through mozjpeg and WebP through libwebp, both at
//! a fixed low quality. Anything that cannot be decoded or re-encoded is passed through
//! untouched.

use anyhow::{anyhow, Result};
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageFormat};
use pixdrop_core::constants::LOSSY_QUALITY;
use pixdrop_core::ImageKind;

/// Result of a transcode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Re-encoded bytes in the detected format.
    Transcoded { bytes: Bytes, kind: ImageKind },
    /// The input, returned as-is because it could not be processed.
    Unchanged(Bytes),
}

impl TranscodeOutcome {
    pub fn bytes(&self) -> &Bytes {
        match self {
            TranscodeOutcome::Transcoded { bytes, .. } => bytes,
            TranscodeOutcome::Unchanged(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            TranscodeOutcome::Transcoded { bytes, .. } => bytes,
            TranscodeOutcome::Unchanged(bytes) => bytes,
        }
    }

    /// Kind of the produced bytes, when known.
    pub fn kind(&self) -> Option<ImageKind> {
        match self {
            TranscodeOutcome::Transcoded { kind, .. } => Some(*kind),
            TranscodeOutcome::Unchanged(_) => None,
        }
    }

    pub fn is_transcoded(&self) -> bool {
        matches!(self, TranscodeOutcome::Transcoded { .. })
    }
}

/// Sniff the image kind from content. Formats outside the allow-list yield `None`.
pub fn detect_kind(data: &[u8]) -> Option<ImageKind> {
    match image::guess_format(data).ok()? {
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::WebP => Some(ImageKind::WebP),
        _ => None,
    }
}

fn image_format(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Png => ImageFormat::Png,
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::WebP => ImageFormat::WebP,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageTranscoder {
    /// Quality used for JPEG and WebP (0-100)
    lossy_quality: u8,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self {
            lossy_quality: LOSSY_QUALITY,
        }
    }
}

impl ImageTranscoder {
    pub fn new(lossy_quality: u8) -> Self {
        Self {
            lossy_quality: lossy_quality.clamp(1, 100),
        }
    }

    pub fn lossy_quality(&self) -> u8 {
        self.lossy_quality
    }

    /// Re-encode `data` in its own format, or hand it back unchanged.
    pub fn transcode(&self, data: Bytes) -> TranscodeOutcome {
        let Some(kind) = detect_kind(&data) else {
            tracing::debug!(size = data.len(), "Unrecognised image content, keeping original bytes");
            return TranscodeOutcome::Unchanged(data);
        };

        match self.encode(&data, kind) {
            Ok(bytes) => {
                tracing::debug!(
                    kind = %kind,
                    original_size = data.len(),
                    transcoded_size = bytes.len(),
                    "Image transcoded"
                );
                TranscodeOutcome::Transcoded { bytes, kind }
            }
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    error = %e,
                    "Image transcoding failed, keeping original bytes"
                );
                TranscodeOutcome::Unchanged(data)
            }
        }
    }

    fn encode(&self, data: &[u8], kind: ImageKind) -> Result<Bytes> {
        let img = image::load_from_memory_with_format(data, image_format(kind))?;

        match kind {
            ImageKind::Png => Self::compress_png(&img),
            ImageKind::Jpeg => self.compress_jpeg(&img),
            ImageKind::WebP => self.compress_webp(&img),
        }
    }

    /// Lossless PNG with maximum compression effort
    fn compress_png(img: &DynamicImage) -> Result<Bytes> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(&self, img: &DynamicImage) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(self.lossy_quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to lossy WebP
    fn compress_webp(&self, img: &DynamicImage) -> Result<Bytes> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder
            .encode_simple(false, self.lossy_quality as f32)
            .map_err(|e| anyhow!("WebP encoding failed: {:?}", e))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}

/// Transcode with the default quality.
pub fn transcode(data: Bytes) -> TranscodeOutcome {
    ImageTranscoder::default().transcode(data)
}

/// Run [`ImageTranscoder::transcode`] on the blocking pool.
pub async fn transcode_blocking(transcoder: ImageTranscoder, data: Bytes) -> TranscodeOutcome {
    let original = data.clone();
    match tokio::task::spawn_blocking(move || transcoder.transcode(data)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Transcoding task failed, keeping original bytes");
            TranscodeOutcome::Unchanged(original)
        }
    }
}
