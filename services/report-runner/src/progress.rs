//! Stage progress events.
//!
//! Pipeline stages send [`ProgressEvent`]s over an unbounded tokio channel,
//! which is fine to use from blocking tasks. A collector task logs each event
//! and keeps the latest one per county. Committed and Failed are final; later
//! events for that county are counted but do not replace them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    DecodingGrid,
    LoadingBoundaries,
    Aggregating,
    RollingUp,
    Assembling,
    Rendering,
    Committed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DecodingGrid => "decoding_grid",
            Stage::LoadingBoundaries => "loading_boundaries",
            Stage::Aggregating => "aggregating",
            Stage::RollingUp => "rolling_up",
            Stage::Assembling => "assembling",
            Stage::Rendering => "rendering",
            Stage::Committed => "committed",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Committed | Stage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    /// `None` for run-wide stages
    pub county_id: Option<String>,
    pub stage: Stage,
    pub percent: u8,
    pub timestamp: DateTime<Utc>,
}

/// Sending half, cloned into every county task.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    run_id: Uuid,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn emit(&self, county_id: Option<&str>, stage: Stage, percent: u8) {
        let event = ProgressEvent {
            run_id: self.run_id,
            county_id: county_id.map(str::to_string),
            stage,
            percent: percent.min(100),
            timestamp: Utc::now(),
        };
        // the collector only goes away at shutdown
        if self.tx.send(event).is_err() {
            debug!("Progress collector closed");
        }
    }

    pub fn county(&self, county_id: &str, stage: Stage, percent: u8) {
        self.emit(Some(county_id), stage, percent);
    }
}

/// What the collector saw before it stopped.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    pub events: usize,
    pub run: Option<ProgressEvent>,
    pub latest: BTreeMap<String, ProgressEvent>,
}

impl ProgressLog {
    pub fn stage_of(&self, county_id: &str) -> Option<Stage> {
        self.latest.get(county_id).map(|e| e.stage)
    }

    fn record(&mut self, event: ProgressEvent) {
        self.events += 1;
        let county = event.county_id.as_deref().unwrap_or("-");
        if event.stage == Stage::Failed {
            warn!(run_id = %event.run_id, county_id = county, stage = event.stage.as_str(), "County failed");
        } else {
            info!(
                run_id = %event.run_id,
                county_id = county,
                stage = event.stage.as_str(),
                percent = event.percent,
                "Progress"
            );
        }
        match &event.county_id {
            Some(id) if self.stage_of(id).is_some_and(|s| s.is_terminal()) => {
                debug!(county_id = %id, stage = event.stage.as_str(), "Ignoring progress after final stage");
            }
            Some(id) => {
                self.latest.insert(id.clone(), event);
            }
            None => self.run = Some(event),
        }
    }
}

pub struct ProgressCollector {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressCollector {
    /// Collect events until every reporter is dropped or the handle is finished.
    pub fn spawn(self) -> ProgressHandle {
        let (stop, stopped) = oneshot::channel();
        ProgressHandle {
            stop,
            task: tokio::spawn(self.run(stopped)),
        }
    }

    async fn run(mut self, mut stopped: oneshot::Receiver<()>) -> ProgressLog {
        let mut log = ProgressLog::default();
        loop {
            tokio::select! {
                biased;
                event = self.rx.recv() => match event {
                    Some(event) => log.record(event),
                    None => break,
                },
                _ = &mut stopped => {
                    while let Ok(event) = self.rx.try_recv() {
                        log.record(event);
                    }
                    break;
                }
            }
        }
        log
    }
}

/// Running collector task.
pub struct ProgressHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<ProgressLog>,
}

impl ProgressHandle {
    /// Stop after the events already sent, even if reporters are still alive.
    pub async fn finish(self) -> Result<ProgressLog, JoinError> {
        // the task may already have ended on its own
        let _ = self.stop.send(());
        self.task.await
    }
}

pub fn channel(run_id: Uuid) -> (ProgressReporter, ProgressCollector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter { run_id, tx }, ProgressCollector { rx })
}
