//! Storage setup and initialization

use anyhow::{Context, Result};
use pixdrop_core::Config;
use pixdrop_services::{LocalStorage, MetadataStore, Storage};
use std::sync::Arc;

/// Create the upload directory and the metadata document's directory, then open both.
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Arc<MetadataStore>)> {
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        metadata_path = %config.metadata_path.display(),
        "Initializing storage..."
    );

    let storage = LocalStorage::new(&config.upload_dir)
        .await
        .context("Failed to initialize upload directory")?;

    let metadata = MetadataStore::new(&config.metadata_path);
    metadata
        .ensure_parent_dir()
        .await
        .context("Failed to initialize metadata directory")?;

    // A corrupt document is not fatal at startup; uploads and sweeps report it.
    match metadata.load().await {
        Ok(index) => tracing::info!(entries = index.len(), "Metadata store loaded"),
        Err(e) => tracing::error!(error = %e, "Metadata store is unreadable"),
    }

    Ok((Arc::new(storage), Arc::new(metadata)))
}
