// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection model
//!
//! Steps:
//! 1. Decode the upload to RGB
//! 2. Crop-to-fill: scale to cover the model input, center-crop the overflow
//! 3. Scale every channel from [0, 255] to [0.0, 1.0]
//! 4. Lay out as NHWC with a batch of one: [1, H, W, 3]

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use tracing::debug;

use super::tensor::{InputShape, InputTensor};
use crate::vision::errors::DetectError;
use crate::vision::image_utils::decode_image_bytes;

/// Decode raw upload bytes and turn them into a model input tensor
pub fn preprocess(bytes: &[u8], target: InputShape) -> Result<InputTensor, DetectError> {
    let (image, image_info) = decode_image_bytes(bytes)?;
    debug!(
        "Decoded {:?} image: {}x{}, {} bytes",
        image_info.format, image_info.width, image_info.height, image_info.size_bytes
    );
    preprocess_image(&image, target)
}

/// Turn an already decoded image into a model input tensor
pub fn preprocess_image(
    image: &DynamicImage,
    target: InputShape,
) -> Result<InputTensor, DetectError> {
    let fitted = fit_to_shape(image, target)?;
    let rgb = fitted.to_rgb8();

    if rgb.width() as usize != target.width || rgb.height() as usize != target.height {
        return Err(DetectError::Shape(format!(
            "resize produced {}x{}, expected {}x{}",
            rgb.width(),
            rgb.height(),
            target.width,
            target.height
        )));
    }

    // RgbImage stores rows top to bottom with interleaved channels, which is NHWC order
    let data: Vec<f32> = rgb
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();

    let array = Array4::from_shape_vec((1, target.height, target.width, 3), data)?;
    InputTensor::new(array, target)
}

/// Crop-to-fill resize
///
/// The crop window has the target's aspect ratio, is as large as the source
/// allows and is centered; it is then resampled to exactly the target size.
/// Content outside the window is discarded (no letterbox padding).
pub fn fit_to_shape(
    image: &DynamicImage,
    target: InputShape,
) -> Result<DynamicImage, DetectError> {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return Err(DetectError::Shape(format!(
            "cannot resize empty image ({}x{})",
            orig_w, orig_h
        )));
    }
    if target.width == 0 || target.height == 0 {
        return Err(DetectError::Shape(format!(
            "invalid target size {}x{}",
            target.width, target.height
        )));
    }

    let target_w = target.width as u32;
    let target_h = target.height as u32;

    // Scale that makes the source cover the target in both directions
    let scale = (target_w as f64 / orig_w as f64).max(target_h as f64 / orig_h as f64);

    let crop_w = ((target_w as f64 / scale).round() as u32).clamp(1, orig_w);
    let crop_h = ((target_h as f64 / scale).round() as u32).clamp(1, orig_h);

    let offset_x = (orig_w - crop_w) / 2;
    let offset_y = (orig_h - crop_h) / 2;

    let cropped = image.crop_imm(offset_x, offset_y, crop_w, crop_h);
    Ok(cropped.resize_exact(target_w, target_h, FilterType::Lanczos3))
}
