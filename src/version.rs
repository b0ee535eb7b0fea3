// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the detection node

/// Full version string with feature description
pub const VERSION: &str = "v1.2.0-session-pool-2025-10-13";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-13";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Detect Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
