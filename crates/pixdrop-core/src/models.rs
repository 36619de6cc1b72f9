//! Domain models
//!
//! Pixdrop only knows three image kinds. Everything else is rejected at validation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An image kind accepted by the upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    WebP,
}

impl ImageKind {
    /// Every accepted kind, in the order they are listed to clients.
    pub const ALL: [ImageKind; 3] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::WebP];

    /// Resolve a MIME type (case-insensitive) to an accepted kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" => Some(ImageKind::Jpeg),
            "image/webp" => Some(ImageKind::WebP),
            _ => None,
        }
    }

    /// Resolve a file extension (without the dot) to an accepted kind.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "webp" => Some(ImageKind::WebP),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::WebP => "image/webp",
        }
    }

    /// Extension used for stored files.
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::WebP => "webp",
        }
    }

    /// Comma-separated list of accepted MIME types, for error messages and logs.
    pub fn allowed_mime_types() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.mime_type())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageKind::from_mime("image/png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("IMAGE/JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/webp"), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_mime("image/gif"), None);
        assert_eq!(ImageKind::from_mime("image/jpg"), None);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ImageKind::Png.extension(), "png");
        assert_eq!(ImageKind::Jpeg.extension(), "jpg");
        assert_eq!(ImageKind::WebP.extension(), "webp");
        assert_eq!(ImageKind::from_extension("JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("gif"), None);
    }

    #[test]
    fn test_allowed_mime_types() {
        assert_eq!(
            ImageKind::allowed_mime_types(),
            "image/png, image/jpeg, image/webp"
        );
    }
}
