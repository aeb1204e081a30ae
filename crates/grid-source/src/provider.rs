//! Upstream collaborators that yield forecast grids.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use forecast_common::{BoundingBox, GridVariable};
use tracing::{info, instrument};

use crate::decoder::GridDecoder;
use crate::error::{GridSourceError, Result};
use crate::snapshot::ForecastGrid;

/// Source of decoded forecast grids for a region.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Seven daily snapshots covering `bbox` with every `required` variable.
    async fn fetch(&self, bbox: &BoundingBox, required: &[GridVariable]) -> Result<ForecastGrid>;

    /// Human readable origin of the data, for logs.
    fn describe(&self) -> String;
}

/// Reads a GRIB2 file (optionally gzip-compressed) from local disk.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    decoder: GridDecoder,
}

impl FileProvider {
    pub fn new(path: impl AsRef<Path>, decoder: GridDecoder) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            decoder,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ForecastProvider for FileProvider {
    #[instrument(skip(self, required), fields(path = %self.path.display()))]
    async fn fetch(&self, bbox: &BoundingBox, required: &[GridVariable]) -> Result<ForecastGrid> {
        let data = Bytes::from(tokio::fs::read(&self.path).await?);
        info!(bytes = data.len(), "Read forecast file");

        // Decoding is CPU bound
        let decoder = self.decoder.clone();
        let bbox = *bbox;
        let required = required.to_vec();
        tokio::task::spawn_blocking(move || decoder.decode_region(data, &bbox, &required))
            .await
            .map_err(|e| GridSourceError::Io(std::io::Error::other(e.to_string())))?
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
