// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Top-1 detection selection
//!
//! Rows are scanned in runtime order. A row takes part only if its objectness
//! is strictly above the threshold; among those, the row whose best class
//! score is strictly highest wins. Ties keep the earlier row. There is no
//! overlap suppression, so only one object is ever reported per image.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::labels::ClassLabelTable;
use super::tensor::{InputShape, OutputTensor, OBJECTNESS_INDEX, ROW_HEADER_LEN};

/// Default objectness gate
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// A single reported object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Highest class score of the winning row (not renormalized)
    pub probability: f32,
    /// `[y, x, h, w]` in the units selected by [`BoxUnits`]
    pub bounding_box: [f32; 4],
}

/// Units of the reported bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxUnits {
    /// The four values exactly as the model produced them
    #[default]
    Normalized,
    /// Scaled by the model input size: y and h by H, x and w by W
    Pixels,
}

impl BoxUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxUnits::Normalized => "normalized",
            BoxUnits::Pixels => "pixels",
        }
    }

    pub fn apply(&self, bbox: [f32; 4], input: InputShape) -> [f32; 4] {
        match self {
            BoxUnits::Normalized => bbox,
            BoxUnits::Pixels => {
                let (h, w) = (input.height as f32, input.width as f32);
                [bbox[0] * h, bbox[1] * w, bbox[2] * h, bbox[3] * w]
            }
        }
    }
}

impl std::str::FromStr for BoxUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normalized" => Ok(BoxUnits::Normalized),
            "pixels" => Ok(BoxUnits::Pixels),
            other => Err(format!(
                "unknown box units '{}', expected 'normalized' or 'pixels'",
                other
            )),
        }
    }
}

/// Pick the single best detection from a raw runtime output
///
/// Returns `None` when no row passes the objectness gate.
pub fn select(
    output: &OutputTensor,
    labels: &ClassLabelTable,
    confidence_threshold: f32,
) -> Option<Detection> {
    let mut best: Option<Detection> = None;
    let mut best_probability = 0.0f32;

    for row in output.rows() {
        // Written as a negated `>` so NaN objectness is skipped too
        if !(row[OBJECTNESS_INDEX] > confidence_threshold) {
            continue;
        }

        let scores = row.slice(ndarray::s![ROW_HEADER_LEN..]);
        let Some((class_id, class_probability)) = argmax(scores) else {
            continue;
        };

        if class_probability > best_probability {
            best_probability = class_probability;
            best = Some(Detection {
                label: labels.name_for(class_id),
                probability: class_probability,
                bounding_box: [row[0], row[1], row[2], row[3]],
            });
        }
    }

    best
}

/// Index and value of the first maximum
fn argmax(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut iter = scores.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    }))
}
