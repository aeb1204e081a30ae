//! Report artifacts on disk.
//!
//! Layout: `<root>/<county_id>/<year>-W<week>/{report.json,report.csv,report.pdf}`.
//! A county's files are written into a staging directory next to the final
//! one and renamed into place, so readers see all three files or none.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use forecast_common::ReportPeriod;
use tracing::{debug, info};

pub const JSON_FILE: &str = "report.json";
pub const CSV_FILE: &str = "report.csv";
pub const PDF_FILE: &str = "report.pdf";

/// Rendered outputs of one report.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub json: String,
    pub csv: String,
    pub pdf: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report_dir(&self, county_id: &str, period: &ReportPeriod) -> PathBuf {
        self.root.join(county_id).join(period.key())
    }

    /// Write all three files and swap them in as one directory.
    pub async fn commit(
        &self,
        county_id: &str,
        period: &ReportPeriod,
        artifacts: &ReportArtifacts,
    ) -> Result<PathBuf> {
        let target = self.report_dir(county_id, period);
        let parent = self.root.join(county_id);
        tokio::fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&parent)
            .with_context(|| format!("Failed to create staging directory in {}", parent.display()))?;

        for (name, bytes) in [
            (JSON_FILE, artifacts.json.as_bytes()),
            (CSV_FILE, artifacts.csv.as_bytes()),
            (PDF_FILE, artifacts.pdf.as_slice()),
        ] {
            let path = staging.path().join(name);
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        // a previous run's directory is moved aside before the swap
        let previous = parent.join(format!(".previous-{}", period.key()));
        let replaced = tokio::fs::try_exists(&target).await.unwrap_or(false);
        if replaced {
            if tokio::fs::try_exists(&previous).await.unwrap_or(false) {
                tokio::fs::remove_dir_all(&previous).await.ok();
            }
            tokio::fs::rename(&target, &previous)
                .await
                .with_context(|| format!("Failed to move aside {}", target.display()))?;
        }

        if let Err(e) = tokio::fs::rename(staging.path(), &target).await {
            if replaced {
                tokio::fs::rename(&previous, &target).await.ok();
            }
            return Err(e).with_context(|| format!("Failed to commit {}", target.display()));
        }
        if replaced {
            tokio::fs::remove_dir_all(&previous).await.ok();
        }

        debug!(staging = %staging.path().display(), "Staging directory renamed");
        info!(county_id, path = %target.display(), "Committed report artifacts");
        Ok(target)
    }
}
