//! Batch orchestration of the weekly county report run.

pub mod artifacts;
pub mod config;
pub mod pipeline;
pub mod progress;

pub use artifacts::{ArtifactStore, ReportArtifacts};
pub use config::{expand_env_vars, RunnerConfig};
pub use pipeline::{CountyFailure, CountyOutcome, Pipeline, RunRequest, RunSummary};
pub use progress::{ProgressEvent, ProgressLog, ProgressReporter, Stage};
