// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup loading of the detection model and its label table
//!
//! Unlike a per-request failure, anything going wrong here is fatal: the
//! caller is expected to abort startup with the returned error.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DetectConfig;
use crate::vision::detection::{
    ClassLabelTable, DetectionPipeline, DetectionRuntime, OnnxDetectionRuntime,
};

/// Summary of the loaded model, reported by `/health` and the CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionModelInfo {
    pub input_height: usize,
    pub input_width: usize,
    pub num_classes: usize,
    pub sessions: usize,
}

/// Owns the process-wide detection state built at startup
pub struct DetectionModelManager {
    pipeline: DetectionPipeline,
}

impl DetectionModelManager {
    /// Load the label table and the ONNX runtime described by `config`
    pub async fn new(config: &DetectConfig) -> Result<Self> {
        config.validate().context("Invalid detection configuration")?;

        let labels = Self::load_labels(config)?;

        let runtime = OnnxDetectionRuntime::new(&config.model_path, config.runtime_options())
            .await
            .with_context(|| format!("Failed to load detection model {}", config.model_path))?;

        if let Some(width) = runtime.output_row_width() {
            if width != labels.len() + 5 {
                warn!(
                    "⚠️ Model rows carry {} class scores but {} labels are loaded",
                    width.saturating_sub(5),
                    labels.len()
                );
            }
        }

        Ok(Self::from_parts(Arc::new(runtime), Arc::new(labels), config))
    }

    /// Assemble from an already loaded runtime (used by tests and tools)
    pub fn from_parts(
        runtime: Arc<dyn DetectionRuntime>,
        labels: Arc<ClassLabelTable>,
        config: &DetectConfig,
    ) -> Self {
        let pipeline = DetectionPipeline::new(runtime, labels)
            .with_confidence_threshold(config.confidence_threshold)
            .with_box_units(config.box_units)
            .with_inference_timeout(config.inference_timeout())
            .with_max_image_bytes(config.max_upload_bytes);
        Self { pipeline }
    }

    /// Built-in COCO table unless a labels file is configured
    pub fn load_labels(config: &DetectConfig) -> Result<ClassLabelTable> {
        match config.labels_path {
            Some(ref path) => {
                let labels = ClassLabelTable::from_file(path)
                    .with_context(|| format!("Failed to load labels from {}", path))?;
                info!("✅ Loaded {} class labels from {}", labels.len(), path);
                Ok(labels)
            }
            None => {
                let labels = ClassLabelTable::coco();
                info!("Using built-in COCO label table ({} classes)", labels.len());
                Ok(labels)
            }
        }
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> DetectionPipeline {
        self.pipeline
    }

    pub fn info(&self) -> DetectionModelInfo {
        model_info(&self.pipeline)
    }
}

/// Describe the model behind a pipeline
pub fn model_info(pipeline: &DetectionPipeline) -> DetectionModelInfo {
    let shape = pipeline.runtime().input_shape();
    DetectionModelInfo {
        input_height: shape.height,
        input_width: shape.width,
        num_classes: pipeline.labels().len(),
        sessions: pipeline.runtime().session_count(),
    }
}
