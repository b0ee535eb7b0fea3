// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use detect_node::{
    api::{start_server, AppState},
    config::DetectConfig,
    vision::{detection::BoxUnits, DetectionModelManager},
};
use std::{env, path::PathBuf, sync::Arc};

/// Single-object detection HTTP server
#[derive(Parser, Debug)]
#[command(name = "detect-node", version, about, long_about = None)]
struct ServeArgs {
    /// TOML configuration file (also read from DETECT_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// ONNX detection model
    #[arg(long)]
    model: Option<String>,

    /// Newline-delimited class names
    #[arg(long)]
    labels: Option<String>,

    /// Objectness threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Bounding box units: normalized or pixels
    #[arg(long)]
    box_units: Option<BoxUnits>,
}

impl ServeArgs {
    fn apply(self, config: &mut DetectConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(labels) = self.labels {
            config.labels_path = Some(labels);
        }
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(units) = self.box_units {
            config.box_units = units;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = ServeArgs::parse();

    println!("🚀 Starting Detect Node...\n");
    println!("📦 {}", detect_node::version::get_version_string());
    println!("🏷️  Build: {}", detect_node::version::VERSION);
    println!();

    let mut config =
        DetectConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    println!("🧠 Loading detection model from {}...", config.model_path);
    let manager = DetectionModelManager::new(&config).await?;
    let info = manager.info();
    println!(
        "✅ Model ready: input {}x{}, {} classes, {} session(s)",
        info.input_height, info.input_width, info.num_classes, info.sessions
    );

    let addr = config.bind_addr();
    let state = Arc::new(AppState::from_manager(manager, &config));

    println!("\n🌐 Endpoints:");
    println!("  POST http://{}/detect", addr);
    println!("  GET  http://{}/health", addr);
    println!("\nPress Ctrl+C to stop\n");

    start_server(state, &addr).await
}
