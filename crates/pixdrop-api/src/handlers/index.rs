use pixdrop_core::constants::{MAX_UPLOAD_BYTES, UPLOADS_ROUTE};
use pixdrop_core::ImageKind;

/// Usage hint for anyone hitting the root.
pub async fn index() -> String {
    format!(
        "Send a POST request to /upload/ with a JSON body {{\"datauri\": \"data:image/png;base64,...\"}}. \
         Accepted types: {} (max {}MB). Stored files are served from {}/<filename>.",
        ImageKind::allowed_mime_types(),
        MAX_UPLOAD_BYTES / 1024 / 1024,
        UPLOADS_ROUTE
    )
}
