//! Fixed limits of the upload pipeline.

/// Largest accepted decoded upload, in bytes (15 MiB).
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

/// Quality used when re-encoding lossy formats (JPEG, WebP), out of 100.
pub const LOSSY_QUALITY: u8 = 20;

/// Number of random bytes in a generated filename (hex-encoded, so twice as many characters).
pub const FILENAME_RANDOM_BYTES: usize = 16;

/// Public path prefix under which stored uploads are served.
pub const UPLOADS_ROUTE: &str = "/uploads";
