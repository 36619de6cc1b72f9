use pixdrop_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, services, routes)
    let (state, router) = pixdrop_api::setup::initialize_app(config.clone()).await?;

    // Retention sweep runs for the lifetime of the server
    let cleanup_handle = state.cleanup_service.clone().start();

    let result = pixdrop_api::setup::server::start_server(&config, router).await;

    cleanup_handle.abort();
    tracing::info!("Cleanup task stopped");

    result
}
