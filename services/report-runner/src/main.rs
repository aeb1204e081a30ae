//! Weekly ward-level weather report run.
//!
//! Decodes one GFS forecast file, aggregates it over the ward boundaries of
//! each requested county and writes JSON, CSV and PDF reports.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use forecast_common::{BoundingBox, ReportPeriod};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use report_runner::{Pipeline, RunRequest, RunnerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "report-runner")]
#[command(about = "Ward-level weekly weather reports for Kenyan counties")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "REPORT_RUNNER_CONFIG")]
    config: Option<PathBuf>,

    /// GRIB2 forecast file (optionally gzip-compressed)
    #[arg(long, env = "REPORT_RUNNER_GRID")]
    grid: Option<PathBuf>,

    /// County and ward boundaries GeoJSON
    #[arg(long, env = "REPORT_RUNNER_BOUNDARIES")]
    boundaries: Option<PathBuf>,

    /// Forecast region as "min_lon,min_lat,max_lon,max_lat"
    #[arg(long, value_parser = BoundingBox::parse)]
    region: Option<BoundingBox>,

    /// Artifact output directory
    #[arg(short, long, env = "REPORT_RUNNER_OUTPUT")]
    output: Option<PathBuf>,

    /// County code to report on; repeat for several (default: all)
    #[arg(long = "county")]
    counties: Vec<String>,

    /// ISO year of the report week
    #[arg(long, requires = "week")]
    year: Option<i32>,

    /// ISO week number of the report week
    #[arg(long, requires = "year")]
    week: Option<u32>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_format)?;
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    info!("Starting report run");

    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(grid) = args.grid {
        config.grid_path = Some(grid);
    }
    if let Some(boundaries) = args.boundaries {
        config.boundaries_path = Some(boundaries);
    }
    if let Some(region) = args.region {
        config.grid.region = region;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if !args.counties.is_empty() {
        config.counties = args.counties;
    }
    config.validate().context("Invalid configuration")?;

    let period = match (args.year, args.week) {
        (Some(year), Some(week)) => Some(ReportPeriod::iso_week(year, week)?),
        _ => None,
    };
    let request = RunRequest {
        grid_path: config
            .grid_path
            .clone()
            .context("No forecast grid given (--grid or grid_path)")?,
        boundaries_path: config
            .boundaries_path
            .clone()
            .context("No boundaries given (--boundaries or boundaries_path)")?,
        counties: Vec::new(),
        period,
    };
    let metrics_file = config.metrics_file.clone();

    // Handle Ctrl+C
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal");
            shutdown_tx.send(()).ok();
        }
    });

    let pipeline = Pipeline::new(config);
    let summary = pipeline.run(request, shutdown_rx).await?;

    if let Some(path) = metrics_file {
        tokio::fs::write(&path, prometheus.render())
            .await
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    for outcome in &summary.committed {
        info!(
            county_id = %outcome.county_id,
            path = %outcome.path.display(),
            wards = outcome.wards,
            advisories = outcome.advisories,
            "Report written"
        );
    }

    anyhow::ensure!(
        summary.is_success(),
        "{} of {} counties failed{}",
        summary.failures.len(),
        summary.failures.len() + summary.committed.len(),
        if summary.cancelled { " (run cancelled)" } else { "" }
    );
    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().with_thread_ids(true).finish())?
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}
