// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::http_server::AppState;
use crate::version::VERSION_NUMBER;
use crate::vision::detection::BoxUnits;
use crate::vision::model_manager::{model_info, DetectionModelInfo};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: DetectionModelInfo,
    pub confidence_threshold: f32,
    pub box_units: BoxUnits,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            status: "healthy".to_string(),
            version: VERSION_NUMBER.to_string(),
            model: model_info(&state.pipeline),
            confidence_threshold: state.pipeline.confidence_threshold(),
            box_units: state.pipeline.box_units(),
        }
    }
}

/// GET /health - Liveness plus a summary of the loaded model
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}

