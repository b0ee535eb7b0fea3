// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mapping of detection failures onto HTTP responses
//!
//! Every failure leaves the server as `500 {"error": "<description>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::vision::DetectError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl From<&DetectError> for ErrorResponse {
    fn from(err: &DetectError) -> Self {
        Self::new(err.to_string())
    }
}

/// HTTP status for a detection failure
pub fn status_code(_err: &DetectError) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        warn!("Detection request failed ({}): {}", self.kind(), self);
        (status_code(&self), Json(ErrorResponse::from(&self))).into_response()
    }
}
