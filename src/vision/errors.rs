// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the detection pipeline
//!
//! Every stage (upload extraction, decoding, preprocessing, inference)
//! returns one of these. The HTTP layer converts them to a response once.

use thiserror::Error;

use super::image_utils::ImageError;

/// Errors that can occur while serving a single detection request
#[derive(Error, Debug)]
pub enum DetectError {
    /// The bytes could not be turned into a raster image
    #[error("Invalid image: {0}")]
    Decode(#[from] ImageError),

    /// The multipart upload did not carry the expected field
    #[error("Missing required field '{0}' in upload")]
    MissingField(String),

    /// Preprocessing could not produce the tensor shape the model expects
    #[error("Tensor shape mismatch: {0}")]
    Shape(String),

    /// The runtime call failed or returned something unusable
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The blocking inference task did not finish in time
    #[error("Inference timed out after {0} ms")]
    Timeout(u64),
}

impl DetectError {
    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::Decode(_) => "decode_failure",
            DetectError::MissingField(_) => "missing_field",
            DetectError::Shape(_) => "shape_error",
            DetectError::Inference(_) => "inference_failure",
            DetectError::Timeout(_) => "timeout",
        }
    }
}

impl From<ndarray::ShapeError> for DetectError {
    fn from(e: ndarray::ShapeError) -> Self {
        DetectError::Shape(e.to_string())
    }
}

impl From<ort::Error> for DetectError {
    fn from(e: ort::Error) -> Self {
        DetectError::Inference(e.to_string())
    }
}
