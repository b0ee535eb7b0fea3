// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline tests through the public API
//!
//! Covers preprocessing output for several resolutions and formats, and the
//! blocking/async entry points against a recording runtime.

use detect_node::vision::{
    detection::{preprocess, BoxUnits, InputShape, InputTensor, OutputTensor},
    ClassLabelTable, DetectError, DetectionPipeline, DetectionRuntime,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Counts calls and checks every input tensor it sees
struct RecordingRuntime {
    shape: InputShape,
    calls: AtomicUsize,
    rows: Array2<f32>,
}

impl DetectionRuntime for RecordingRuntime {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn infer(&self, input: &InputTensor) -> Result<OutputTensor, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let array = input.as_array();
        assert_eq!(
            array.shape(),
            &[1, self.shape.height, self.shape.width, 3]
        );
        assert!(array.iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(OutputTensor::new(self.rows.clone()))
    }
}

#[test]
fn test_any_resolution_preprocesses_to_model_shape() {
    let target = InputShape::new(64, 48);
    for (w, h) in [(1, 1), (17, 900), (640, 480), (48, 64), (1000, 3)] {
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
            let bytes = encode(&gradient(w, h), format);
            let tensor = preprocess(&bytes, target).unwrap();
            let array = tensor.as_array();
            assert_eq!(array.shape(), &[1, 64, 48, 3], "{}x{} {:?}", w, h, format);
            assert!(array.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}

#[test]
fn test_preprocess_rejects_garbage() {
    let err = preprocess(b"GIF89a but not really", InputShape::new(8, 8)).unwrap_err();
    assert!(matches!(err, DetectError::Decode(_)));
}

#[tokio::test]
async fn test_run_end_to_end() {
    let runtime = Arc::new(RecordingRuntime {
        shape: InputShape::new(32, 64),
        calls: AtomicUsize::new(0),
        rows: Array2::from_shape_vec((1, 7), vec![0.5, 0.5, 0.25, 0.25, 0.95, 0.1, 0.8]).unwrap(),
    });
    let labels = Arc::new(ClassLabelTable::new(["left", "right"]).unwrap());
    let pipeline =
        DetectionPipeline::new(runtime.clone(), labels).with_box_units(BoxUnits::Pixels);

    let bytes = encode(&gradient(200, 100), ImageFormat::Png);
    let detection = pipeline.run(bytes).await.unwrap().unwrap();

    assert_eq!(detection.label, "right");
    assert_eq!(detection.probability, 0.8);
    assert_eq!(detection.bounding_box, [16.0, 32.0, 8.0, 16.0]);
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_pipeline() {
    let runtime = Arc::new(RecordingRuntime {
        shape: InputShape::new(16, 16),
        calls: AtomicUsize::new(0),
        rows: Array2::zeros((0, 7)),
    });
    let labels = Arc::new(ClassLabelTable::new(["a", "b"]).unwrap());
    let pipeline = DetectionPipeline::new(runtime.clone(), labels);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        let bytes = encode(&gradient(10 + i, 20), ImageFormat::Png);
        tasks.push(tokio::spawn(async move { pipeline.run(bytes).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), None);
    }
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_decode_failure_skips_runtime() {
    let runtime = Arc::new(RecordingRuntime {
        shape: InputShape::new(16, 16),
        calls: AtomicUsize::new(0),
        rows: Array2::zeros((0, 7)),
    });
    let labels = Arc::new(ClassLabelTable::new(["a", "b"]).unwrap());
    let pipeline = DetectionPipeline::new(runtime.clone(), labels);

    let err = pipeline.run(Vec::new()).await.unwrap_err();
    assert!(matches!(err, DetectError::Decode(_)));
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
}
