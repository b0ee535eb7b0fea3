// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - Image decoding for uploads (`image_utils`)
//! - The detection pipeline (`detection`)
//! - Startup loading of the model and label table (`model_manager`)

pub mod detection;
pub mod errors;
pub mod image_utils;
pub mod model_manager;

pub use detection::{ClassLabelTable, Detection, DetectionPipeline, DetectionRuntime};
pub use errors::DetectError;
pub use image_utils::{check_size, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{DetectionModelInfo, DetectionModelManager};
