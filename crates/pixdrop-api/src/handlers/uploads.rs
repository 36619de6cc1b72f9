//! Static serving of stored uploads.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use pixdrop_core::{AppError, ImageKind};
use pixdrop_services::is_stored_filename;
use std::sync::Arc;

/// Stream a stored file. Names that this service could not have produced are 404s.
#[tracing::instrument(skip(state), fields(operation = "get_upload"))]
pub async fn get_upload(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let kind = filename
        .rsplit_once('.')
        .and_then(|(_, extension)| ImageKind::from_extension(extension))
        .filter(|_| is_stored_filename(&filename))
        .ok_or_else(|| AppError::NotFound(filename.clone()))?;

    let content_length = state.storage.content_length(&filename).await?;
    let stream = state.storage.download_stream(&filename).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, kind.mime_type())
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
