//! Shared application state handed to every handler.

use pixdrop_core::Config;
use pixdrop_services::{CleanupService, MetadataStore, Storage, UploadService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub metadata: Arc<MetadataStore>,
    pub upload_service: UploadService,
    pub cleanup_service: Arc<CleanupService>,
}
