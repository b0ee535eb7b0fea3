// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::{DetectUpload, IMAGE_FIELD};
use super::response::DetectResponse;
use crate::api::http_server::AppState;
use crate::vision::DetectError;

/// POST /detect - Report the single most confident object in an image
///
/// # Request
/// Multipart form with the encoded image in the `image` field.
///
/// # Response
/// - `{"detection": {"label", "probability", "bounding_box": [y, x, h, w]}}`
/// - `{"message": "No object detected with high confidence"}`
///
/// # Errors
/// Any failure is a 500 with `{"error": "<description>"}`.
pub async fn detect_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, DetectError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Request is not a multipart upload: {}", rejection);
        DetectError::MissingField(IMAGE_FIELD.to_string())
    })?;

    let upload = DetectUpload::from_multipart(multipart).await?;
    debug!(
        "Detection upload received: {} bytes (file: {:?}, type: {:?})",
        upload.bytes.len(),
        upload.file_name,
        upload.content_type
    );

    let started = Instant::now();
    let detection = state.pipeline.run(upload.bytes).await?;

    match detection {
        Some(ref d) => info!(
            "Detected '{}' ({:.3}) in {}ms",
            d.label,
            d.probability,
            started.elapsed().as_millis()
        ),
        None => info!(
            "No detection above threshold in {}ms",
            started.elapsed().as_millis()
        ),
    }

    Ok(Json(DetectResponse::from(detection)))
}
