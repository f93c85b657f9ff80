// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! el - inspect and exercise run directories

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{checkpoint, demo, metrics};

#[derive(Parser)]
#[command(
    name = "el",
    version,
    about = "el - metric logging and checkpointing for long-running loops"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the contents of a checkpoint
    Checkpoint(checkpoint::CheckpointArgs),
    /// Print recorded metrics
    Metrics(metrics::MetricsArgs),
    /// Run a synthetic loop that logs and checkpoints
    Demo(demo::DemoArgs),
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Checkpoint(args) => checkpoint::handle(args),
        Commands::Metrics(args) => metrics::handle(args),
        Commands::Demo(args) => demo::handle(args),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
