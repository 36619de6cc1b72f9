//! Route configuration and setup

use crate::handlers;
use crate::middleware::{rate_limit_middleware, HttpRateLimiter};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use pixdrop_core::constants::UPLOADS_ROUTE;
use pixdrop_core::Config;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let rate_limiter = setup_rate_limiter(config);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(setup_cors())
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_size_bytes));

    let app = Router::new()
        .route("/", get(handlers::index::index))
        .route("/upload", post(handlers::upload::upload_image))
        .route("/upload/", post(handlers::upload::upload_image))
        .route(
            &format!("{}/{{filename}}", UPLOADS_ROUTE),
            get(handlers::uploads::get_upload),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(middleware)
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Per-IP limiter shared by every route, with background eviction of stale buckets
fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let rate_limiter = Arc::new(HttpRateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window(),
        config.trusted_proxy_count,
    ));
    HttpRateLimiter::spawn_cleanup(&rate_limiter);

    tracing::info!(
        limit = config.rate_limit_max_requests,
        window_secs = config.rate_limit_window_secs,
        trusted_proxy_count = config.trusted_proxy_count,
        "HTTP rate limiting enabled"
    );

    rate_limiter
}
