//! Driveup CLI binary.
//!
//! Mirrors a local video tree into the remote drive and moves uploaded files
//! into a parallel "uploaded" tree.

use anyhow::Context;
use clap::Parser;
use driveup::config::Settings;
use driveup::dispatcher::{Dispatcher, RunStats};
use driveup::drive::{DriveClient, Session};
use driveup::logging;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::error;

/// Upload a local video tree to the remote drive, skipping files that are
/// already present.
#[derive(Parser)]
#[command(name = "driveup")]
#[command(about = "Mirror a local video tree into a cloud drive folder hierarchy")]
struct Cli {
    /// Local directory tree to upload from
    local_videos_path: PathBuf,

    /// Directory tree that successfully uploaded files are moved into
    local_uploaded_videos_path: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of concurrent uploads
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.debug) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!(error = %format!("{:#}", e), "run failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunStats> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(workers) = cli.workers {
        settings.worker_count = workers;
    }

    let session = Session::from_settings(&settings.api)?;
    let client = DriveClient::new(&settings.api, session)?;
    let dispatcher = Dispatcher::new(Arc::new(client), &settings);

    let stats = dispatcher
        .run(&cli.local_videos_path, &cli.local_uploaded_videos_path)
        .await?;
    Ok(stats)
}
