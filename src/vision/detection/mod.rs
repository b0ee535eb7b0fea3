// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-object detection
//!
//! Components:
//! - `preprocessing` - Crop-to-fill resize and [0, 1] scaling to NHWC
//! - `runtime` - Inference engine contract and the ONNX Runtime adapter
//! - `session_pool` - Round-robin locking over loaded sessions
//! - `selector` - Objectness gate and top-1 selection
//! - `labels` - Class label table
//! - `pipeline` - The three stages wired together

pub mod labels;
pub mod pipeline;
pub mod preprocessing;
pub mod runtime;
pub mod selector;
pub mod session_pool;
pub mod tensor;

pub use labels::{ClassLabelTable, LabelError, COCO_LABELS};
pub use pipeline::DetectionPipeline;
pub use preprocessing::{fit_to_shape, preprocess, preprocess_image};
pub use runtime::{DetectionRuntime, OnnxDetectionRuntime, RuntimeOptions};
pub use selector::{select, BoxUnits, Detection, DEFAULT_CONFIDENCE_THRESHOLD};
pub use session_pool::SessionPool;
pub use tensor::{InputShape, InputTensor, OutputTensor};
