// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;

pub use detect::{detect_handler, DetectResponse, DetectUpload, NO_DETECTION_MESSAGE};
pub use errors::ErrorResponse;
pub use handlers::{health_handler, HealthResponse};
pub use http_server::{create_app, serve, start_server, AppState};
