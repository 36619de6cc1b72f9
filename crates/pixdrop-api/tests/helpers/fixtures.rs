//! Test fixtures: small encoded images wrapped in data URIs.

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;

/// Gradient image encoded in `format`.
pub fn create_test_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128, 255])
    });
    let img = match format {
        // The JPEG encoder rejects an alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode test image");
    buffer
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

pub fn upload_body(datauri: impl Into<String>) -> Value {
    json!({ "datauri": datauri.into() })
}

pub fn png_upload() -> Value {
    upload_body(data_uri(
        "image/png",
        &create_test_image(ImageFormat::Png, 32, 32),
    ))
}

pub fn jpeg_upload() -> Value {
    upload_body(data_uri(
        "image/jpeg",
        &create_test_image(ImageFormat::Jpeg, 32, 32),
    ))
}
