// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /detect for single-object detection on an uploaded image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::detect_handler;
pub use request::{DetectUpload, IMAGE_FIELD};
pub use response::{DetectResponse, NO_DETECTION_MESSAGE};
