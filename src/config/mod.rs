// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the detection node
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! environment variables, then command-line flags (applied by the binaries).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::vision::detection::{BoxUnits, RuntimeOptions, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "DETECT_CONFIG";

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the detection server and its model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
    /// ONNX model artifact
    pub model_path: String,
    /// Newline-delimited class names; built-in COCO table when unset
    pub labels_path: Option<String>,
    /// Objectness gate
    pub confidence_threshold: f32,
    /// Units of the reported bounding box
    pub box_units: BoxUnits,
    /// Independent runtime sessions loaded from the model file
    pub session_pool_size: usize,
    /// Threads used inside a single inference run
    pub intra_threads: usize,
    /// Input height for models with a dynamic one
    pub input_height: Option<usize>,
    /// Input width for models with a dynamic one
    pub input_width: Option<usize>,
    /// Per-request bound on the blocking stages; unbounded when unset
    pub inference_timeout_ms: Option<u64>,
    /// Request body limit for uploads, also the cap on the encoded image
    pub max_upload_bytes: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: "./models/yolov5.onnx".to_string(),
            labels_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            box_units: BoxUnits::Normalized,
            session_pool_size: 1,
            intra_threads: 4,
            input_height: None,
            input_width: None,
            inference_timeout_ms: None,
            max_upload_bytes: MAX_IMAGE_SIZE + MULTIPART_OVERHEAD,
        }
    }
}

impl DetectConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Defaults, then the file named by `path` or `DETECT_CONFIG`, then env
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into));

        let mut config = match file {
            Some(file) => Self::from_file(file)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Override fields from any key lookup; unparsable values are ignored
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DETECT_HOST") {
            self.host = v;
        }
        if let Some(v) = parsed(&lookup, "DETECT_PORT") {
            self.port = v;
        }
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = v;
        }
        if let Some(v) = lookup("LABELS_PATH") {
            self.labels_path = Some(v);
        }
        if let Some(v) = parsed(&lookup, "CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = v;
        }
        if let Some(v) = parsed(&lookup, "BOX_UNITS") {
            self.box_units = v;
        }
        if let Some(v) = parsed(&lookup, "SESSION_POOL_SIZE") {
            self.session_pool_size = v;
        }
        if let Some(v) = parsed(&lookup, "INTRA_THREADS") {
            self.intra_threads = v;
        }
        if let Some(v) = parsed(&lookup, "MODEL_INPUT_HEIGHT") {
            self.input_height = Some(v);
        }
        if let Some(v) = parsed(&lookup, "MODEL_INPUT_WIDTH") {
            self.input_width = Some(v);
        }
        if let Some(v) = parsed(&lookup, "INFERENCE_TIMEOUT_MS") {
            self.inference_timeout_ms = Some(v);
        }
        if let Some(v) = parsed(&lookup, "MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".to_string()));
        }
        if self.session_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "session_pool_size must be greater than 0".to_string(),
            ));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Invalid(
                "intra_threads must be greater than 0".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.model_path.is_empty() {
            return Err(ConfigError::Invalid("model_path must be set".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            session_pool_size: self.session_pool_size,
            intra_threads: self.intra_threads,
            input_height: self.input_height,
            input_width: self.input_width,
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
