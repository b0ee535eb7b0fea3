// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction for POST /detect

use axum_extra::extract::multipart::{Multipart, MultipartError};
use tracing::debug;

use crate::vision::{DetectError, ImageError};

/// Name of the multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// The image part of a detection upload
#[derive(Debug, Clone)]
pub struct DetectUpload {
    /// Raw encoded image bytes
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl DetectUpload {
    /// Read fields until the `image` one is found; other fields are skipped
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, DetectError> {
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            if field.name() != Some(IMAGE_FIELD) {
                debug!("Skipping multipart field {:?}", field.name());
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(malformed)?;

            return Ok(Self {
                bytes: bytes.to_vec(),
                file_name,
                content_type,
            });
        }

        Err(DetectError::MissingField(IMAGE_FIELD.to_string()))
    }
}

fn malformed(e: MultipartError) -> DetectError {
    DetectError::Decode(ImageError::DecodeFailed(format!(
        "unreadable multipart body: {}",
        e.body_text()
    )))
}
