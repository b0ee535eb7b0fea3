// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection runtime adapter
//!
//! The pipeline only needs two things from the network: the spatial input
//! size, resolved once at startup, and a blocking `infer` call. ONNX Runtime
//! sessions overwrite their tensor buffers on every run, so each call holds a
//! session from the [`SessionPool`] for input, run and output read.

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Value, ValueType};
use std::path::Path;
use tracing::{debug, info};

use super::session_pool::SessionPool;
use super::tensor::{InputShape, InputTensor, OutputTensor};
use crate::vision::errors::DetectError;

/// Interface the detection pipeline requires from an inference engine
#[cfg_attr(test, mockall::automock)]
pub trait DetectionRuntime: Send + Sync {
    /// Spatial size every input tensor must have
    fn input_shape(&self) -> InputShape;

    /// Run one forward pass; blocks until the output is available
    fn infer(&self, input: &InputTensor) -> Result<OutputTensor, DetectError>;

    /// Number of independent sessions that can run concurrently
    fn session_count(&self) -> usize {
        1
    }
}

/// Options for loading the ONNX detection model
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Number of sessions loaded from the same file
    pub session_pool_size: usize,
    /// Threads used inside a single run
    pub intra_threads: usize,
    /// Height to use when the model declares a dynamic one
    pub input_height: Option<usize>,
    /// Width to use when the model declares a dynamic one
    pub input_width: Option<usize>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            session_pool_size: 1,
            intra_threads: 4,
            input_height: None,
            input_width: None,
        }
    }
}

/// ONNX Runtime backed detector (CPU execution)
pub struct OnnxDetectionRuntime {
    sessions: SessionPool<Session>,
    input_name: String,
    input_shape: InputShape,
    /// Row width declared by the model, when static
    output_row_width: Option<usize>,
}

impl std::fmt::Debug for OnnxDetectionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetectionRuntime")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("input_shape", &self.input_shape)
            .field("output_row_width", &self.output_row_width)
            .finish_non_exhaustive()
    }
}

impl OnnxDetectionRuntime {
    /// Load the detection model from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The first input is not `[1, H, W, 3]` and no override resolves it
    pub async fn new<P: AsRef<Path>>(model_path: P, options: RuntimeOptions) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }
        if options.session_pool_size == 0 {
            anyhow::bail!("Session pool size must be greater than 0");
        }

        info!(
            "Loading detection model from {} ({} session(s))",
            model_path.display(),
            options.session_pool_size
        );

        let mut sessions = Vec::with_capacity(options.session_pool_size);
        for _ in 0..options.session_pool_size {
            sessions.push(Self::build_session(model_path, options.intra_threads)?);
        }

        let input = sessions[0]
            .inputs
            .first()
            .context("Detection model declares no inputs")?;
        let input_name = input.name.clone();
        let input_dims = tensor_dims(&input.input_type)
            .with_context(|| format!("Model input '{}' is not a tensor", input_name))?;
        debug!("Detection model input '{}' dims: {:?}", input_name, input_dims);

        let input_shape =
            resolve_input_shape(&input_dims, options.input_height, options.input_width)?;

        let output_row_width = sessions[0]
            .outputs
            .first()
            .and_then(|output| tensor_dims(&output.output_type))
            .and_then(|dims| dims.last().copied())
            .filter(|width| *width > 0)
            .map(|width| width as usize);
        debug!("Detection model output row width: {:?}", output_row_width);

        info!(
            "✅ Detection model loaded - input {}x{}",
            input_shape.height, input_shape.width
        );

        let sessions = SessionPool::new(sessions).context("Session pool is empty")?;

        Ok(Self {
            sessions,
            input_name,
            input_shape,
            output_row_width,
        })
    }

    fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
        Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load detection model from {}", model_path.display())
            })
    }

    /// Row width the model declares statically, if any
    pub fn output_row_width(&self) -> Option<usize> {
        self.output_row_width
    }
}

impl DetectionRuntime for OnnxDetectionRuntime {
    fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    fn infer(&self, input: &InputTensor) -> Result<OutputTensor, DetectError> {
        if input.shape() != self.input_shape {
            return Err(DetectError::Shape(format!(
                "input is {}x{}, model expects {}x{}",
                input.shape().height,
                input.shape().width,
                self.input_shape.height,
                self.input_shape.width
            )));
        }

        let input_value = Value::from_array(input.as_array().to_owned())?;

        let mut session = self.sessions.acquire()?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_value])?;

        let output = outputs[0].try_extract_array::<f32>()?;
        debug!("Detection output shape: {:?}", output.shape());

        OutputTensor::from_dyn(output)
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Declared dimensions of a tensor value (`-1` marks a dynamic axis)
fn tensor_dims(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

/// Work out the spatial input size from the declared NHWC dimensions
///
/// Static dimensions come from the model; dynamic ones need an override.
pub fn resolve_input_shape(
    dims: &[i64],
    height_override: Option<usize>,
    width_override: Option<usize>,
) -> Result<InputShape> {
    if dims.len() != 4 {
        anyhow::bail!("Expected a 4-D model input [1, H, W, 3], got {:?}", dims);
    }
    if dims[0] > 1 {
        anyhow::bail!("Model input batch must be 1, got {:?}", dims);
    }
    if dims[3] > 0 && dims[3] != 3 {
        anyhow::bail!(
            "Model input must be NHWC with 3 channels, got {:?}",
            dims
        );
    }

    let resolve = |declared: i64, requested: Option<usize>, axis: &str| -> Result<usize> {
        match (declared, requested) {
            (d, Some(r)) if d > 0 && d as usize != r => anyhow::bail!(
                "Configured input {} {} conflicts with model's {}",
                axis,
                r,
                d
            ),
            (d, _) if d > 0 => Ok(d as usize),
            (_, Some(r)) if r > 0 => Ok(r),
            _ => anyhow::bail!(
                "Model input {} is dynamic; set it explicitly in the configuration",
                axis
            ),
        }
    };

    Ok(InputShape::new(
        resolve(dims[1], height_override, "height")?,
        resolve(dims[2], width_override, "width")?,
    ))
}
