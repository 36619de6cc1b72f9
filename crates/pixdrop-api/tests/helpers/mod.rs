//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p pixdrop-api`.

pub mod fixtures;

use axum_test::TestServer;
use pixdrop_api::setup::{routes, services};
use pixdrop_api::state::AppState;
use pixdrop_core::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server, state, and the temp dir holding uploads and metadata.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.state.config.upload_dir.join(filename)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.state.config.metadata_path.clone()
    }
}

/// Config rooted in a fresh temp dir.
pub fn create_test_config(temp_dir: &TempDir) -> Config {
    Config {
        upload_dir: temp_dir.path().join("uploads"),
        metadata_path: temp_dir.path().join("data").join("metadata.json"),
        ..Config::default()
    }
}

/// Setup test app with default limits and isolated storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, adjusting the config before services are built.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut config = create_test_config(&temp_dir);
    customize(&mut config);

    let state = services::initialize_services(&config)
        .await
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");

    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Filename out of the "Image uploaded successfully to <name>." reply.
pub fn uploaded_filename(body: &str) -> String {
    body.strip_prefix("Image uploaded successfully to ")
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or_else(|| panic!("unexpected upload reply: {}", body))
        .to_string()
}
