// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection pipeline: bytes -> tensor -> raw rows -> one detection
//!
//! Owns shared handles to the runtime and the label table. Cloning is cheap,
//! which lets the async entry point move a copy onto the blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::labels::ClassLabelTable;
use super::preprocessing::preprocess;
use super::runtime::DetectionRuntime;
use super::selector::{select, BoxUnits, Detection, DEFAULT_CONFIDENCE_THRESHOLD};
use super::tensor::{InputShape, InputTensor, OutputTensor, ROW_HEADER_LEN};
use crate::vision::errors::DetectError;
use crate::vision::image_utils::{check_size, MAX_IMAGE_SIZE};

#[derive(Clone)]
pub struct DetectionPipeline {
    runtime: Arc<dyn DetectionRuntime>,
    labels: Arc<ClassLabelTable>,
    confidence_threshold: f32,
    box_units: BoxUnits,
    inference_timeout: Option<Duration>,
    max_image_bytes: usize,
}

impl std::fmt::Debug for DetectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPipeline")
            .field("input_shape", &self.runtime.input_shape())
            .field("labels", &self.labels.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("box_units", &self.box_units)
            .field("inference_timeout", &self.inference_timeout)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl DetectionPipeline {
    pub fn new(runtime: Arc<dyn DetectionRuntime>, labels: Arc<ClassLabelTable>) -> Self {
        Self {
            runtime,
            labels,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            box_units: BoxUnits::default(),
            inference_timeout: None,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }

    /// Set the objectness gate
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_box_units(mut self, units: BoxUnits) -> Self {
        self.box_units = units;
        self
    }

    /// Bound the time a request may wait for the blocking stages
    pub fn with_inference_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Largest encoded image accepted by [`Self::detect_bytes`]
    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn DetectionRuntime> {
        &self.runtime
    }

    pub fn labels(&self) -> &ClassLabelTable {
        &self.labels
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn box_units(&self) -> BoxUnits {
        self.box_units
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Run the whole pipeline on encoded image bytes (blocking)
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<Option<Detection>, DetectError> {
        check_size(bytes, self.max_image_bytes)?;
        let input_shape = self.runtime.input_shape();
        let input = preprocess(bytes, input_shape)?;
        self.detect_tensor(&input, input_shape)
    }

    fn detect_tensor(
        &self,
        input: &InputTensor,
        input_shape: InputShape,
    ) -> Result<Option<Detection>, DetectError> {
        let started = Instant::now();
        let output = self.runtime.infer(input)?;
        info!(
            "Inference complete: {} candidate rows in {}ms",
            output.num_rows(),
            started.elapsed().as_millis()
        );

        self.check_class_count(&output)?;

        let detection = select(&output, &self.labels, self.confidence_threshold).map(|mut d| {
            d.bounding_box = self.box_units.apply(d.bounding_box, input_shape);
            d
        });
        debug!("Selected detection: {:?}", detection);

        Ok(detection)
    }

    /// Run the pipeline on the blocking pool, honoring the configured timeout
    ///
    /// A panic inside the blocking stages is reported as an inference failure.
    pub async fn run(&self, bytes: Vec<u8>) -> Result<Option<Detection>, DetectError> {
        let pipeline = self.clone();
        let task = tokio::task::spawn_blocking(move || pipeline.detect_bytes(&bytes));

        let joined = match self.inference_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| DetectError::Timeout(limit.as_millis() as u64))?,
            None => task.await,
        };

        joined.map_err(|e| DetectError::Inference(format!("inference task failed: {}", e)))?
    }

    fn check_class_count(&self, output: &OutputTensor) -> Result<(), DetectError> {
        let expected = ROW_HEADER_LEN + self.labels.len();
        if output.num_rows() > 0 && output.row_width() != expected {
            return Err(DetectError::Inference(format!(
                "model rows have {} values, expected {} (5 + {} labels)",
                output.row_width(),
                expected,
                self.labels.len()
            )));
        }
        Ok(())
    }
}
