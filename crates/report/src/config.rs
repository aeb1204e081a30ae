//! Report content settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DISCLAIMER: &str = "This report is generated from automated weather forecast \
data. Ward-level values are derived from spatial aggregation of global forecasts for planning \
purposes only. Contact the local meteorological office for official updates and warnings.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub disclaimer: String,
    pub data_source: String,
    pub system_version: String,
    /// Pre-rendered map image per variable ("rainfall", "temperature", "wind")
    pub map_images: BTreeMap<String, PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            data_source: "GFS".to_string(),
            system_version: env!("CARGO_PKG_VERSION").to_string(),
            map_images: BTreeMap::new(),
        }
    }
}
