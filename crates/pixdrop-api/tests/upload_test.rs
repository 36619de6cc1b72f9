//! Upload API integration tests.
//!
//! Run with: `cargo test -p pixdrop-api --test upload_test`

mod helpers;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use helpers::fixtures::{create_test_image, data_uri, jpeg_upload, png_upload, upload_body};
use helpers::{setup_test_app, setup_test_app_with, uploaded_filename};
use image::ImageFormat;
use pixdrop_core::constants::MAX_UPLOAD_BYTES;
use serde_json::Value;
use std::collections::BTreeMap;

fn read_metadata(path: &std::path::Path) -> BTreeMap<String, DateTime<Utc>> {
    let raw = std::fs::read_to_string(path).expect("metadata document should exist");
    serde_json::from_str(&raw).expect("metadata document should be valid JSON")
}

#[tokio::test]
async fn test_index_describes_usage() {
    let app = setup_test_app().await;

    let response = app.client().get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("/upload/"));
}

#[tokio::test]
async fn test_upload_png() {
    let app = setup_test_app().await;
    let before = Utc::now();

    let response = app.client().post("/upload/").json(&png_upload()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let filename = uploaded_filename(&response.text());
    assert_eq!(filename.len(), 32 + ".png".len());
    assert!(filename.ends_with(".png"));
    assert!(app.upload_path(&filename).is_file());

    let index = read_metadata(&app.metadata_path());
    let uploaded_at = index[&filename];
    assert!(uploaded_at >= before && uploaded_at <= Utc::now());
}

#[tokio::test]
async fn test_upload_jpeg_without_trailing_slash() {
    let app = setup_test_app().await;

    let response = app.client().post("/upload").json(&jpeg_upload()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let filename = uploaded_filename(&response.text());
    assert!(filename.ends_with(".jpg"));

    let stored = std::fs::read(app.upload_path(&filename)).unwrap();
    assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_uploaded_file_is_served() {
    let app = setup_test_app().await;
    let upload = app.client().post("/upload/").json(&png_upload()).await;
    let filename = uploaded_filename(&upload.text());

    let response = app.client().get(&format!("/uploads/{}", filename)).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    let on_disk = std::fs::read(app.upload_path(&filename)).unwrap();
    assert_eq!(response.as_bytes().to_vec(), on_disk);
}

#[tokio::test]
async fn test_unknown_upload_is_404() {
    let app = setup_test_app().await;

    let missing = app
        .client()
        .get("/uploads/0123456789abcdef0123456789abcdef.png")
        .expect_failure()
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let foreign = app
        .client()
        .get("/uploads/metadata.json")
        .expect_failure()
        .await;
    assert_eq!(foreign.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_data_uri() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload/")
        .json(&upload_body("not-a-uri"))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Invalid data.uri.");
    assert!(!app.metadata_path().exists());
}

#[tokio::test]
async fn test_missing_datauri_field() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload/")
        .json(&Value::Object(Default::default()))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Invalid data.uri.");
}

#[tokio::test]
async fn test_missing_body() {
    let app = setup_test_app().await;

    let response = app.client().post("/upload/").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Invalid data.uri.");
}

#[tokio::test]
async fn test_file_too_large() {
    let app = setup_test_app().await;
    let payload = vec![0u8; MAX_UPLOAD_BYTES + 1];

    let response = app
        .client()
        .post("/upload/")
        .json(&upload_body(data_uri("image/png", &payload)))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "File too large. Maximum size is 15MB.");
}

#[tokio::test]
async fn test_unsupported_media_type() {
    let app = setup_test_app().await;
    let gif = create_test_image(ImageFormat::Gif, 8, 8);

    let response = app
        .client()
        .post("/upload/")
        .json(&upload_body(data_uri("image/gif", &gif)))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().starts_with("Unsupported file type."));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = setup_test_app_with(|config| config.max_body_size_bytes = 1024).await;

    let response = app
        .client()
        .post("/upload/")
        .json(&upload_body(data_uri("image/png", &[7u8; 4096])))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_rate_limit_after_25_requests() {
    let app = setup_test_app().await;

    for _ in 0..25 {
        let response = app.client().get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let response = app.client().get("/").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.text(),
        "Too many requests from this IP, please try again after 15 minutes."
    );
    assert_eq!(response.header("x-ratelimit-limit"), "25");
    assert_eq!(response.header("x-ratelimit-remaining"), "0");
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let app = setup_test_app_with(|config| {
        config.rate_limit_max_requests = 2;
        config.trusted_proxy_count = 1;
    })
    .await;

    for _ in 0..2 {
        app.client()
            .get("/")
            .add_header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .await;
    }
    let blocked = app
        .client()
        .get("/")
        .add_header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .expect_failure()
        .await;
    assert_eq!(blocked.status_code(), StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .client()
        .get("/")
        .add_header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .await;
    assert_eq!(other.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_sweep_removes_expired_upload() {
    let app = setup_test_app().await;
    let upload = app.client().post("/upload/").json(&png_upload()).await;
    let filename = uploaded_filename(&upload.text());

    let report = app
        .state
        .cleanup_service
        .sweep_at(Utc::now() + chrono::Duration::days(31))
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert!(!app.upload_path(&filename).exists());
    assert!(read_metadata(&app.metadata_path()).is_empty());

    let response = app
        .client()
        .get(&format!("/uploads/{}", filename))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
