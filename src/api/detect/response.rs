// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::Detection;

/// Message returned when no row passes the objectness gate
pub const NO_DETECTION_MESSAGE: &str = "No object detected with high confidence";

/// Successful outcome of POST /detect
///
/// Serializes as either `{"detection": {...}}` or `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectResponse {
    Detection { detection: Detection },
    NoDetection { message: String },
}

impl DetectResponse {
    pub fn no_detection() -> Self {
        DetectResponse::NoDetection {
            message: NO_DETECTION_MESSAGE.to_string(),
        }
    }
}

impl From<Option<Detection>> for DetectResponse {
    fn from(detection: Option<Detection>) -> Self {
        match detection {
            Some(detection) => DetectResponse::Detection { detection },
            None => DetectResponse::no_detection(),
        }
    }
}
