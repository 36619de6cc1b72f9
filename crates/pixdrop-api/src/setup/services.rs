//! Service initialization

use super::storage::setup_storage;
use crate::state::AppState;
use anyhow::Result;
use pixdrop_core::Config;
use pixdrop_services::{CleanupService, UploadService};
use std::sync::Arc;

/// Build storage and services into the shared state. Background tasks are not started.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let (storage, metadata) = setup_storage(config).await?;

    let upload_service = UploadService::new(storage.clone(), metadata.clone());

    let cleanup_service = Arc::new(CleanupService::new(
        storage.clone(),
        metadata.clone(),
        config.retention(),
        config.cleanup_interval(),
    ));

    tracing::info!(
        retention_days = config.retention_days,
        cleanup_interval_secs = config.cleanup_interval_secs,
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        storage,
        metadata,
        upload_service,
        cleanup_service,
    }))
}
