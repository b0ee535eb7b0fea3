// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /detect
//!
//! A fixed-output runtime stands in for the ONNX model so the whole request
//! path (multipart extraction, decoding, preprocessing, selection and error
//! mapping) runs without model files.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use detect_node::{
    api::{create_app, AppState, NO_DETECTION_MESSAGE},
    vision::{
        detection::{InputShape, InputTensor, OutputTensor},
        ClassLabelTable, DetectError, DetectionPipeline, DetectionRuntime,
    },
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "detect-test-boundary";

/// Runtime that returns the same rows for every input
struct FixedRuntime {
    rows: Array2<f32>,
}

impl DetectionRuntime for FixedRuntime {
    fn input_shape(&self) -> InputShape {
        InputShape::new(16, 16)
    }

    fn infer(&self, input: &InputTensor) -> Result<OutputTensor, DetectError> {
        assert_eq!(input.as_array().shape(), &[1, 16, 16, 3]);
        Ok(OutputTensor::new(self.rows.clone()))
    }
}

fn app_with_rows(rows: Array2<f32>) -> axum::Router {
    app_with_limit(rows, 1024 * 1024)
}

fn app_with_limit(rows: Array2<f32>, max_upload_bytes: usize) -> axum::Router {
    let labels = ClassLabelTable::new(["cat", "dog", "bird"]).unwrap();
    let pipeline = DetectionPipeline::new(Arc::new(FixedRuntime { rows }), Arc::new(labels))
        .with_max_image_bytes(max_upload_bytes);
    create_app(Arc::new(AppState::new(pipeline, max_upload_bytes)))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 200, 30])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Pixel noise that PNG cannot compress much
fn noisy_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
    }));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/detect")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[cfg(test)]
mod detect_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_detection_found() {
        let rows = Array2::from_shape_vec(
            (2, 8),
            vec![
                0.1, 0.2, 0.3, 0.4, 0.9, 0.2, 0.6, 0.1, //
                0.5, 0.25, 0.125, 0.5, 0.8, 0.05, 0.05, 0.75,
            ],
        )
        .unwrap();
        let app = app_with_rows(rows);

        let request = detect_request(multipart_body("image", &png_bytes(40, 30)));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detection"]["label"], "bird");
        assert_eq!(body["detection"]["probability"], 0.75);
        assert_eq!(
            body["detection"]["bounding_box"],
            serde_json::json!([0.5, 0.25, 0.125, 0.5])
        );
    }

    #[tokio::test]
    async fn test_nothing_above_threshold() {
        let rows = Array2::from_shape_vec((1, 8), vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.9, 0.0, 0.0])
            .unwrap();
        let app = app_with_rows(rows);

        let request = detect_request(multipart_body("image", &png_bytes(8, 8)));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "message": NO_DETECTION_MESSAGE }));
        assert_eq!(body["message"], "No object detected with high confidence");
    }

    #[tokio::test]
    async fn test_non_image_blob_is_server_error() {
        let app = app_with_rows(Array2::zeros((0, 8)));

        let (status, body) = send(
            app,
            detect_request(multipart_body("image", b"this is a text file, not pixels")),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let app = app_with_rows(Array2::zeros((0, 8)));

        let request = detect_request(multipart_body("photo", &png_bytes(8, 8)));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("image"));
    }

    #[tokio::test]
    async fn test_non_multipart_request() {
        let app = app_with_rows(Array2::zeros((0, 8)));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/detect")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"image": "nope"}"#))
            .unwrap();

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("image"));
    }

    #[tokio::test]
    async fn test_class_count_mismatch() {
        // 5 + 2 scores, but three labels are loaded
        let rows = Array2::from_shape_vec((1, 7), vec![0.0, 0.0, 0.0, 0.0, 0.9, 0.9, 0.1])
            .unwrap();
        let app = app_with_rows(rows);

        let request = detect_request(multipart_body("image", &png_bytes(8, 8)));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Inference failed"));
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let app = app_with_limit(Array2::zeros((0, 8)), 512);
        let image = noisy_png_bytes(64, 64);
        assert!(image.len() > 512);

        let (status, body) = send(app, detect_request(multipart_body("image", &image))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_cap_follows_configured_limit() {
        // A 2 KiB cap that still leaves room for multipart framing
        let rows = Array2::from_shape_vec((1, 8), vec![0.0, 0.0, 0.0, 0.0, 0.1, 0.9, 0.0, 0.0])
            .unwrap();
        let small = png_bytes(8, 8);
        assert!(small.len() < 1024);
        let (status, _) = send(
            app_with_limit(rows, 2048),
            detect_request(multipart_body("image", &small)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_detect_rejects_get() {
        let app = app_with_rows(Array2::zeros((0, 8)));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/detect")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
