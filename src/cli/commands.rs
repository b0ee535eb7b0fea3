// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::api::{DetectResponse, ErrorResponse};
use crate::config::DetectConfig;
use crate::vision::detection::{
    BoxUnits, ClassLabelTable, DetectionRuntime, OnnxDetectionRuntime,
};
use crate::vision::{DetectError, Detection, DetectionModelManager};

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// ONNX detection model
    #[arg(long, env = "MODEL_PATH")]
    pub model: String,

    /// Newline-delimited class names (built-in COCO table when omitted)
    #[arg(long, env = "LABELS_PATH")]
    pub labels: Option<String>,

    /// Objectness threshold
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Bounding box units: normalized or pixels
    #[arg(long)]
    pub box_units: Option<BoxUnits>,

    /// Input height for models with a dynamic one
    #[arg(long)]
    pub input_height: Option<usize>,

    /// Input width for models with a dynamic one
    #[arg(long)]
    pub input_width: Option<usize>,

    /// Images to run detection on
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// ONNX detection model
    #[arg(long, env = "MODEL_PATH")]
    pub model: String,

    /// Sessions to load
    #[arg(long, default_value_t = 1)]
    pub sessions: usize,

    #[arg(long)]
    pub input_height: Option<usize>,

    #[arg(long)]
    pub input_width: Option<usize>,
}

/// Arguments for the labels command
#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Newline-delimited class names (built-in COCO table when omitted)
    #[arg(long, env = "LABELS_PATH")]
    pub labels: Option<String>,
}

impl DetectArgs {
    fn to_config(&self) -> DetectConfig {
        let mut config = DetectConfig::from_env();
        config.model_path = self.model.clone();
        config.labels_path = self.labels.clone();
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(units) = self.box_units {
            config.box_units = units;
        }
        config.input_height = self.input_height.or(config.input_height);
        config.input_width = self.input_width.or(config.input_width);
        config
    }
}

/// Run the full pipeline on each image and print one JSON document per image
pub async fn detect(args: DetectArgs) -> Result<()> {
    let config = args.to_config();
    let manager = DetectionModelManager::new(&config).await?;
    let pipeline = manager.pipeline();

    let mut failures = 0;
    for path in &args.images {
        let outcome = match std::fs::read(path) {
            Ok(bytes) => pipeline.run(bytes).await,
            Err(e) => Err(DetectError::Decode(crate::vision::ImageError::DecodeFailed(
                format!("cannot read {}: {}", path.display(), e),
            ))),
        };
        if outcome.is_err() {
            failures += 1;
        }
        println!("{}", render_outcome(&outcome)?);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, args.images.len());
    }
    Ok(())
}

/// Print what the runtime resolved for a model
pub async fn inspect(args: InspectArgs) -> Result<()> {
    let config = DetectConfig {
        model_path: args.model.clone(),
        session_pool_size: args.sessions,
        input_height: args.input_height,
        input_width: args.input_width,
        ..DetectConfig::from_env()
    };
    let runtime = OnnxDetectionRuntime::new(&config.model_path, config.runtime_options())
        .await
        .with_context(|| format!("Failed to load {}", args.model))?;

    let shape = runtime.input_shape();
    println!("📦 Model:            {}", args.model);
    println!("  Input shape:      [1, {}, {}, 3]", shape.height, shape.width);
    match runtime.output_row_width() {
        Some(width) => println!(
            "  Output row width: {} ({} classes)",
            width,
            width.saturating_sub(5)
        ),
        None => println!("  Output row width: dynamic"),
    }
    println!("  Sessions:         {}", runtime.session_count());
    Ok(())
}

/// Print the label table with indices
pub fn labels(args: LabelsArgs) -> Result<()> {
    let table = match args.labels {
        Some(ref path) => ClassLabelTable::from_file(path)
            .with_context(|| format!("Failed to load labels from {}", path))?,
        None => ClassLabelTable::coco(),
    };
    print!("{}", format_labels(&table));
    Ok(())
}

/// Same JSON the HTTP endpoint returns for this outcome
pub fn render_outcome(outcome: &Result<Option<Detection>, DetectError>) -> Result<String> {
    let json = match outcome {
        Ok(detection) => serde_json::to_string(&DetectResponse::from(detection.clone()))?,
        Err(e) => serde_json::to_string(&ErrorResponse::from(e))?,
    };
    Ok(json)
}

pub fn format_labels(table: &ClassLabelTable) -> String {
    table
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{:>3}  {}\n", i, name))
        .collect()
}
