// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for GET /health

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use detect_node::{
    api::{create_app, AppState},
    vision::{
        detection::{BoxUnits, InputShape, InputTensor, OutputTensor},
        ClassLabelTable, DetectError, DetectionPipeline, DetectionRuntime,
    },
};
use ndarray::Array2;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

struct IdleRuntime;

impl DetectionRuntime for IdleRuntime {
    fn input_shape(&self) -> InputShape {
        InputShape::new(320, 416)
    }

    fn infer(&self, _input: &InputTensor) -> Result<OutputTensor, DetectError> {
        Ok(OutputTensor::new(Array2::zeros((0, 85))))
    }

    fn session_count(&self) -> usize {
        3
    }
}

#[tokio::test]
async fn test_health_reports_model() {
    let pipeline = DetectionPipeline::new(Arc::new(IdleRuntime), Arc::new(ClassLabelTable::coco()))
        .with_confidence_threshold(0.4)
        .with_box_units(BoxUnits::Pixels);
    let app = create_app(Arc::new(AppState::new(pipeline, 1024)));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], detect_node::version::VERSION_NUMBER);
    assert_eq!(
        body["model"],
        serde_json::json!({
            "input_height": 320,
            "input_width": 416,
            "num_classes": 80,
            "sessions": 3
        })
    );
    assert_eq!(body["confidence_threshold"].as_f64().unwrap() as f32, 0.4);
    assert_eq!(body["box_units"], "pixels");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let pipeline = DetectionPipeline::new(Arc::new(IdleRuntime), Arc::new(ClassLabelTable::coco()));
    let app = create_app(Arc::new(AppState::new(pipeline, 1024)));

    let request = Request::builder()
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
