//! Weekly batch run.
//!
//! The grid is decoded once and the boundary store loaded once; both are
//! shared read-only with one task per county. County tasks are bounded by a
//! semaphore and run their CPU work on the blocking pool. A shutdown signal
//! stops new counties from starting and abandons counties still building;
//! a county already committing finishes its commit.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aggregation::{rollup, AggregationError, SpatialAggregator};
use anyhow::{bail, Context, Result};
use boundaries::BoundaryStore;
use chrono::NaiveDate;
use forecast_common::{GridVariable, ReportPeriod};
use futures::future::join_all;
use grid_source::{FileProvider, ForecastGrid, ForecastProvider, GridDecoder};
use metrics::{counter, histogram};
use report::{AssemblyInput, ReportAssembler};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Semaphore};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::artifacts::{ArtifactStore, ReportArtifacts};
use crate::config::RunnerConfig;
use crate::progress::{self, ProgressLog, ProgressReporter, Stage};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub grid_path: PathBuf,
    pub boundaries_path: PathBuf,
    /// Overrides the configured county list when not empty
    pub counties: Vec<String>,
    /// Defaults to the seven days starting at the first forecast day
    pub period: Option<ReportPeriod>,
}

/// A county that produced no artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyFailure {
    pub county_id: String,
    pub stage: Stage,
    pub error: String,
    /// Stopped by shutdown rather than by an error of its own
    pub cancelled: bool,
}

impl CountyFailure {
    fn new(county_id: &str, stage: Stage, error: impl fmt::Display) -> Self {
        Self {
            county_id: county_id.to_string(),
            stage,
            error: error.to_string(),
            cancelled: false,
        }
    }

    fn cancelled(county_id: &str, reason: &str) -> Self {
        Self {
            cancelled: true,
            ..Self::new(county_id, Stage::Failed, reason)
        }
    }
}

/// A county whose artifacts were committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyOutcome {
    pub county_id: String,
    pub path: PathBuf,
    pub wards: usize,
    pub advisories: usize,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub period: ReportPeriod,
    pub model_run_id: String,
    pub committed: Vec<CountyOutcome>,
    pub failures: Vec<CountyFailure>,
    pub cancelled: bool,
    pub progress: ProgressLog,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Shared state of every county task.
struct CountyContext {
    config: Arc<RunnerConfig>,
    store: Arc<BoundaryStore>,
    grid: Arc<ForecastGrid>,
    period: ReportPeriod,
    artifacts: ArtifactStore,
    progress: ProgressReporter,
}

pub struct Pipeline {
    config: Arc<RunnerConfig>,
}

impl Pipeline {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run every requested county.
    ///
    /// Boundary and forecast errors abort the run; county errors are
    /// collected in the summary. A message on `shutdown`, including one sent
    /// before the call, cancels the run.
    #[instrument(skip_all, fields(grid = %request.grid_path.display()))]
    pub async fn run(
        &self,
        request: RunRequest,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let (progress, collector) = progress::channel(run_id);
        let collector = collector.spawn();
        let (cancel, forwarder) = watch_shutdown(shutdown);
        info!(run_id = %run_id, "Starting report run");

        // ===== Boundaries =====
        progress.emit(None, Stage::LoadingBoundaries, 0);
        let started = Instant::now();
        let boundaries_path = request.boundaries_path.clone();
        let store = tokio::task::spawn_blocking(move || BoundaryStore::load_path(&boundaries_path))
            .await
            .context("Boundary loading task failed")?
            .with_context(|| {
                format!("Failed to load boundaries from {}", request.boundaries_path.display())
            })?;
        record_stage(Stage::LoadingBoundaries, started);
        info!(counties = store.county_count(), wards = store.ward_count(), "Boundaries loaded");

        // ===== Forecast grid =====
        progress.emit(None, Stage::DecodingGrid, 0);
        let started = Instant::now();
        let provider = FileProvider::new(&request.grid_path, GridDecoder::new(self.config.grid.clone()));
        let grid = provider
            .fetch(&self.config.grid.region, &GridVariable::REQUIRED)
            .await
            .with_context(|| format!("Failed to decode forecast grid from {}", provider.describe()))?;
        record_stage(Stage::DecodingGrid, started);
        progress.emit(None, Stage::DecodingGrid, 100);

        let period = match request.period {
            Some(period) => period,
            None => ReportPeriod::starting(
                grid.first_date().context("Forecast grid has no daily snapshots")?,
            ),
        };
        check_period(&grid, &period)?;
        let model_run_id = grid.metadata.model_run_id.clone();
        info!(
            model_run_id = %model_run_id,
            period = %period.key(),
            points = grid.metadata.grid_points_total,
            "Forecast grid decoded"
        );

        let counties = self.counties(&request, &store);
        let ctx = Arc::new(CountyContext {
            config: self.config.clone(),
            store: Arc::new(store),
            grid: Arc::new(grid),
            period,
            artifacts: ArtifactStore::new(self.config.output_dir.clone()),
            progress: progress.clone(),
        });

        // ===== Counties =====
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_counties));
        let mut cancelled = false;
        let mut not_started = Vec::new();
        let mut ids = Vec::new();
        let mut handles = Vec::new();

        for (index, county_id) in counties.iter().enumerate() {
            let mut stop = cancel.clone();
            let permit = tokio::select! {
                biased;
                () = stopped(&mut stop) => {
                    warn!("Shutdown requested, not starting remaining counties");
                    cancelled = true;
                    not_started.extend(counties[index..].iter().cloned());
                    break;
                }
                permit = semaphore.clone().acquire_owned() => permit.context("County semaphore closed")?,
            };

            let ctx = ctx.clone();
            let county_id = county_id.clone();
            let stop = cancel.clone();
            ids.push(county_id.clone());
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                process_county(&ctx, &county_id, stop).await
            }));
        }

        let mut committed = Vec::new();
        let mut failures = Vec::new();
        for (county_id, result) in ids.into_iter().zip(join_all(handles).await) {
            let result = result.unwrap_or_else(|e| {
                Err(CountyFailure::new(&county_id, Stage::Failed, format!("county task panicked: {}", e)))
            });
            match result {
                Ok(outcome) => committed.push(outcome),
                Err(failure) if failure.cancelled => {
                    cancelled = true;
                    warn!(county_id = %failure.county_id, error = %failure.error, "County cancelled");
                    progress.county(&failure.county_id, Stage::Failed, 100);
                    failures.push(failure);
                }
                Err(failure) => {
                    error!(
                        county_id = %failure.county_id,
                        stage = failure.stage.as_str(),
                        error = %failure.error,
                        "County failed"
                    );
                    counter!("counties_failed_total", "stage" => failure.stage.as_str()).increment(1);
                    progress.county(&failure.county_id, Stage::Failed, 100);
                    failures.push(failure);
                }
            }
        }
        for county_id in not_started {
            failures.push(CountyFailure::cancelled(&county_id, "not started, run cancelled"));
        }

        forwarder.abort();
        // abandoned blocking work may still hold a reporter
        drop(ctx);
        drop(progress);
        let progress = collector.finish().await.context("Progress collector failed")?;

        info!(
            run_id = %run_id,
            committed = committed.len(),
            failed = failures.len(),
            cancelled,
            "Report run finished"
        );

        Ok(RunSummary {
            run_id,
            period,
            model_run_id,
            committed,
            failures,
            cancelled,
            progress,
        })
    }

    /// Request list, else configured list, else every county in the store.
    fn counties(&self, request: &RunRequest, store: &BoundaryStore) -> Vec<String> {
        if !request.counties.is_empty() {
            request.counties.clone()
        } else if !self.config.counties.is_empty() {
            self.config.counties.clone()
        } else {
            store.counties().map(|c| c.id.clone()).collect()
        }
    }
}

/// Set the returned flag once `shutdown` fires.
///
/// A message already waiting in `shutdown` sets the flag before this returns.
fn watch_shutdown(
    mut shutdown: broadcast::Receiver<()>,
) -> (watch::Receiver<bool>, tokio::task::JoinHandle<()>) {
    use broadcast::error::{RecvError, TryRecvError};

    let pending = matches!(shutdown.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_)));
    let (tx, rx) = watch::channel(pending);
    let forwarder = tokio::spawn(async move {
        if !pending && matches!(shutdown.recv().await, Ok(()) | Err(RecvError::Lagged(_))) {
            tx.send_replace(true);
        }
        // receivers keep seeing the flag while the sender lives
        tx.closed().await;
    });
    (rx, forwarder)
}

/// Resolves once the flag is set.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stop| *stop).await.is_err() {
        // sender gone without a shutdown
        std::future::pending::<()>().await;
    }
}

/// The forecast days must be exactly the requested period's dates.
fn check_period(grid: &ForecastGrid, period: &ReportPeriod) -> Result<()> {
    let days: Vec<NaiveDate> = grid.snapshots.iter().map(|s| s.valid_date).collect();
    if days != period.dates() {
        bail!(
            "Requested period {} ({} to {}) does not match the forecast days {}",
            period.key(),
            period.start,
            period.end,
            days.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

async fn process_county(
    ctx: &Arc<CountyContext>,
    county_id: &str,
    mut stop: watch::Receiver<bool>,
) -> std::result::Result<CountyOutcome, CountyFailure> {
    let started = Instant::now();
    let seconds = ctx.config.county_timeout_secs;
    let abandoned = Arc::new(AtomicBool::new(false));

    let work = {
        let ctx = ctx.clone();
        let county_id = county_id.to_string();
        let abandoned = abandoned.clone();
        tokio::task::spawn_blocking(move || build_artifacts(&ctx, &county_id, &abandoned))
    };

    // abandoned blocking work stops at its next stage boundary
    let built = tokio::select! {
        joined = tokio::time::timeout(Duration::from_secs(seconds), work) => match joined {
            Err(_) => {
                abandoned.store(true, Ordering::Relaxed);
                let timeout = AggregationError::Timeout {
                    county_id: county_id.to_string(),
                    seconds,
                };
                return Err(CountyFailure::new(county_id, Stage::Aggregating, timeout));
            }
            Ok(Err(e)) => {
                return Err(CountyFailure::new(county_id, Stage::Failed, format!("county work panicked: {}", e)))
            }
            Ok(Ok(result)) => result?,
        },
        () = stopped(&mut stop) => {
            abandoned.store(true, Ordering::Relaxed);
            return Err(CountyFailure::cancelled(county_id, "cancelled by shutdown"));
        }
    };

    // the commit is not cancelled once started
    let path = ctx
        .artifacts
        .commit(county_id, &ctx.period, &built.artifacts)
        .await
        .map_err(|e| CountyFailure::new(county_id, Stage::Rendering, format!("{:#}", e)))?;
    ctx.progress.county(county_id, Stage::Committed, 100);

    counter!("counties_processed_total").increment(1);
    histogram!("county_duration_seconds").record(started.elapsed().as_secs_f64());

    Ok(CountyOutcome {
        county_id: county_id.to_string(),
        path,
        wards: built.wards,
        advisories: built.advisories,
    })
}

struct Built {
    artifacts: ReportArtifacts,
    wards: usize,
    advisories: usize,
}

/// Aggregate, roll up, assemble and render one county.
///
/// Returns early once `abandoned` is set, without emitting further progress.
fn build_artifacts(
    ctx: &CountyContext,
    county_id: &str,
    abandoned: &AtomicBool,
) -> std::result::Result<Built, CountyFailure> {
    let config = &ctx.config;
    let stage = |stage: Stage, percent: u8| {
        if abandoned.load(Ordering::Relaxed) {
            return Err(CountyFailure::cancelled(county_id, "abandoned"));
        }
        ctx.progress.county(county_id, stage, percent);
        Ok(())
    };

    stage(Stage::Aggregating, 10)?;
    let started = Instant::now();
    let aggregation = SpatialAggregator::new(config.aggregation.clone())
        .aggregate(&ctx.store, county_id, &ctx.grid.snapshots)
        .map_err(|e| CountyFailure::new(county_id, Stage::Aggregating, e))?;
    record_stage(Stage::Aggregating, started);
    counter!("wards_aggregated_total").increment(aggregation.wards.len() as u64);

    stage(Stage::RollingUp, 50)?;
    let summary = rollup(&aggregation, &config.aggregation);

    stage(Stage::Assembling, 65)?;
    let assembler = ReportAssembler::new(config.report.clone());
    let report = assembler
        .assemble(AssemblyInput {
            summary: &summary,
            wards: &aggregation.wards,
            period: ctx.period,
            metadata: &ctx.grid.metadata,
            method: aggregation.method,
        })
        .map_err(|e| CountyFailure::new(county_id, Stage::Assembling, e))?;

    stage(Stage::Rendering, 80)?;
    let started = Instant::now();
    let render = |e: report::ReportError| CountyFailure::new(county_id, Stage::Rendering, e);
    let artifacts = ReportArtifacts {
        json: report::to_json(&report).map_err(render)?,
        csv: report::to_csv(&report).map_err(render)?,
        pdf: assembler.to_pdf(&report).map_err(render)?,
    };
    record_stage(Stage::Rendering, started);

    Ok(Built {
        artifacts,
        wards: report.wards.len(),
        advisories: report.quality_flags.len(),
    })
}

fn record_stage(stage: Stage, started: Instant) {
    histogram!("stage_duration_seconds", "stage" => stage.as_str())
        .record(started.elapsed().as_secs_f64());
}
