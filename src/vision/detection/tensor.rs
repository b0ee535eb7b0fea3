// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor types exchanged between the preprocessor, the runtime and the selector

use ndarray::{Array2, Array4, ArrayView1, ArrayViewD, Axis, Ix2};

use crate::vision::errors::DetectError;

/// Number of leading values in a raw row before the class scores: y, x, h, w, objectness
pub const ROW_HEADER_LEN: usize = 5;

/// Index of the objectness score inside a raw row
pub const OBJECTNESS_INDEX: usize = 4;

/// Spatial input size required by the loaded model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

/// Model input of shape [1, H, W, 3] (NHWC) with values in [0.0, 1.0]
#[derive(Debug, Clone)]
pub struct InputTensor(Array4<f32>);

impl InputTensor {
    /// Wrap an array, checking that it is a single RGB image of the given size
    pub fn new(array: Array4<f32>, shape: InputShape) -> Result<Self, DetectError> {
        let expected = [1, shape.height, shape.width, 3];
        if array.shape() != expected {
            return Err(DetectError::Shape(format!(
                "expected {:?}, got {:?}",
                expected,
                array.shape()
            )));
        }
        Ok(Self(array))
    }

    pub fn shape(&self) -> InputShape {
        let dims = self.0.shape();
        InputShape::new(dims[1], dims[2])
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }
}

/// Raw runtime output: one row per candidate, `[y, x, h, w, objectness, scores...]`
#[derive(Debug, Clone)]
pub struct OutputTensor(Array2<f32>);

impl OutputTensor {
    pub fn new(rows: Array2<f32>) -> Self {
        Self(rows)
    }

    /// Build from an arbitrary-rank runtime output
    ///
    /// Accepts `[rows, width]` or `[1, rows, width]`; any other layout is
    /// rejected as an inference failure.
    pub fn from_dyn(output: ArrayViewD<'_, f32>) -> Result<Self, DetectError> {
        let shape = output.shape().to_vec();
        let rows = match shape.len() {
            2 => output.into_dimensionality::<Ix2>()?.to_owned(),
            3 if shape[0] == 1 => output
                .index_axis(Axis(0), 0)
                .into_dimensionality::<Ix2>()?
                .to_owned(),
            _ => {
                return Err(DetectError::Inference(format!(
                    "unexpected output shape {:?}, expected [1, rows, 5 + classes]",
                    shape
                )))
            }
        };
        Ok(Self(rows))
    }

    pub fn num_rows(&self) -> usize {
        self.0.nrows()
    }

    /// Values per row, header included
    pub fn row_width(&self) -> usize {
        self.0.ncols()
    }

    /// Number of class-score slots per row
    pub fn num_classes(&self) -> usize {
        self.row_width().saturating_sub(ROW_HEADER_LEN)
    }

    /// Rows in the order the runtime produced them
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.0.outer_iter()
    }
}
