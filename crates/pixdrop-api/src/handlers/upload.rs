use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub datauri: String,
}

/// Store a base64 data-URI image and reply with its new filename.
#[tracing::instrument(skip(state, request), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<String, HttpAppError> {
    let stored = state.upload_service.upload(&request.datauri).await?;

    Ok(format!("Image uploaded successfully to {}.", stored.filename))
}
