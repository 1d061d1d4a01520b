//! Census geography labeler.
//!
//! Loads county, tract and block boundaries, then labels every row of the
//! configured CSV with the census geography of its start and end points.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use censustag::config::Config;
use censustag::models::Boundaries;
use censustag::pip::Geocoder;
use censustag::pipeline::Pipeline;

use crate::progress::ProgressReporter;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "label")]
#[command(about = "Label CSV trip records with census county, tract and block")]
struct Args {
    /// Configuration file (TOML, or JSON when it ends in .json)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of labeling workers (overrides the config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Labeled output file (overrides the config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Failed rows file (overrides the config)
    #[arg(long)]
    failed_output: Option<PathBuf>,

    /// Dropped rows file (overrides the config)
    #[arg(long)]
    dropped_output: Option<PathBuf>,

    /// Seconds between progress reports
    #[arg(long, default_value = "5")]
    progress_interval: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log progress instead of drawing a spinner
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting census labeling");

    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(output) = args.output {
        config.output_file = output;
    }
    if let Some(failed) = args.failed_output {
        config.failed_output_file = failed;
    }
    if let Some(dropped) = args.dropped_output {
        config.dropped_output_file = dropped;
    }
    config.validate()?;

    info!("Loading boundaries from {}", config.boundary_dir.display());
    let boundary_dir = config.boundary_dir.clone();
    let boundaries = tokio::task::spawn_blocking(move || Boundaries::load_dir(&boundary_dir))
        .await?
        .context("Failed to load boundaries")?;
    let geocoder = Arc::new(Geocoder::new(boundaries));
    info!(
        "Geocoder ready: {} counties, {} tracts in {} county buckets, {} blocks in {} tract buckets",
        geocoder.boundaries().counties.len(),
        geocoder.boundaries().tracts.len(),
        geocoder.index().county_buckets(),
        geocoder.boundaries().blocks.len(),
        geocoder.index().tract_buckets()
    );

    let pipeline = Pipeline::new(geocoder, config.layout(), config.settings());
    let reporter = ProgressReporter::start(
        pipeline.monitor(),
        Duration::from_secs(args.progress_interval.max(1)),
        !args.no_progress,
    )?;

    let result = pipeline.run(config.paths()).await;
    reporter.stop().await;
    let summary = result.context("Labeling run failed")?;

    if !summary.is_balanced() {
        warn!(
            "Counts do not balance: {} started, {} finished",
            summary.started,
            summary.saved + summary.failed + summary.dropped
        );
    }

    info!(
        "Labeled {} rows in {:.1}s: {} saved, {} failed, {} dropped",
        summary.started,
        summary.elapsed.as_secs_f64(),
        summary.saved,
        summary.failed,
        summary.dropped
    );
    info!("Saved output: {}", config.output_file.display());

    Ok(())
}
