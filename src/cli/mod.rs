// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Detect Node CLI
#[derive(Parser, Debug)]
#[command(name = "detect-cli")]
#[command(version)]
#[command(about = "Offline tools for the single-object detection node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run detection on local image files
    Detect(commands::DetectArgs),

    /// Show the resolved input shape and output layout of a model
    Inspect(commands::InspectArgs),

    /// Print the active class label table
    Labels(commands::LabelsArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Detect(args) => commands::detect(args).await,
        Commands::Inspect(args) => commands::inspect(args).await,
        Commands::Labels(args) => commands::labels(args),
    }
}
