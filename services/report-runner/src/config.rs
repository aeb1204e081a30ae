//! Runner configuration.
//!
//! Loaded from a YAML file with `${VAR}` and `${VAR:-default}` substitution;
//! every section falls back to its defaults when omitted.

use std::fs;
use std::path::{Path, PathBuf};

use aggregation::AggregationConfig;
use anyhow::{Context, Result};
use boundaries::knbs;
use grid_source::GridSourceConfig;
use report::ReportConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// GRIB2 forecast file (overridden by --grid)
    pub grid_path: Option<PathBuf>,
    /// County and ward GeoJSON (overridden by --boundaries)
    pub boundaries_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// County codes to report on; empty means all 47
    pub counties: Vec<String>,
    pub max_concurrent_counties: usize,
    pub county_timeout_secs: u64,
    /// Prometheus text snapshot written at the end of the run
    pub metrics_file: Option<PathBuf>,
    pub grid: GridSourceConfig,
    pub aggregation: AggregationConfig,
    pub report: ReportConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            grid_path: None,
            boundaries_path: None,
            output_dir: PathBuf::from("reports"),
            counties: Vec::new(),
            max_concurrent_counties: 4,
            county_timeout_secs: 300,
            metrics_file: None,
            grid: GridSourceConfig::default(),
            aggregation: AggregationConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Read, expand and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: RunnerConfig = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_concurrent_counties > 0,
            "max_concurrent_counties must be greater than 0"
        );
        anyhow::ensure!(
            self.county_timeout_secs > 0,
            "county_timeout_secs must be greater than 0"
        );
        for county in &self.counties {
            anyhow::ensure!(
                knbs::is_county_code(county),
                "Unknown county code in counties: {}",
                county
            );
        }

        anyhow::ensure!(
            self.grid.region.is_valid(),
            "grid.region must have min < max on both axes"
        );
        anyhow::ensure!(!self.grid.model.is_empty(), "grid.model cannot be empty");

        let agg = &self.aggregation;
        anyhow::ensure!(
            agg.min_grid_points >= 1,
            "aggregation.min_grid_points must be at least 1"
        );
        anyhow::ensure!(
            agg.rainy_day_threshold_mm >= 0.0 && agg.flood_risk_threshold_mm >= 0.0,
            "aggregation rainfall thresholds cannot be negative"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&agg.degraded_fraction_threshold),
            "aggregation.degraded_fraction_threshold must be between 0 and 1"
        );

        anyhow::ensure!(
            !self.report.disclaimer.trim().is_empty(),
            "report.disclaimer cannot be empty"
        );
        anyhow::ensure!(
            !self.report.data_source.is_empty(),
            "report.data_source cannot be empty"
        );
        Ok(())
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            expr.push('}');
                        }
                    }
                    Some(c) => expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", expr),
                }
            }

            result.push_str(&resolve_var_expr(&expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregation::AggregationMethod;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("REPORT_RUNNER_TEST_DIR", "/data/out");
        let expanded = expand_env_vars("a: ${REPORT_RUNNER_TEST_DIR}\nb: ${REPORT_RUNNER_UNSET_VAR:-fallback}").unwrap();
        assert_eq!(expanded, "a: /data/out\nb: fallback");

        assert!(expand_env_vars("x: ${REPORT_RUNNER_UNSET_VAR}").is_err());
        assert!(expand_env_vars("x: ${UNCLOSED").is_err());
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_defaults_from_empty_document() {
        let config = RunnerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunnerConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml() {
        std::env::set_var("REPORT_RUNNER_TEST_CONCURRENCY", "8");
        let yaml = r#"
output_dir: ${REPORT_RUNNER_TEST_OUT:-/tmp/reports}
counties: ["01", "47"]
max_concurrent_counties: ${REPORT_RUNNER_TEST_CONCURRENCY}
aggregation:
  method: area_weighted
  min_grid_points: 3
report:
  data_source: GFS 0.25
"#;
        let config = RunnerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.counties, vec!["01", "47"]);
        assert_eq!(config.max_concurrent_counties, 8);
        assert_eq!(config.aggregation.method, AggregationMethod::AreaWeighted);
        assert_eq!(config.aggregation.min_grid_points, 3);
        assert_eq!(config.aggregation.flood_risk_threshold_mm, 50.0);
        assert_eq!(config.report.data_source, "GFS 0.25");
        assert!(!config.report.disclaimer.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_failures() {
        let config = RunnerConfig {
            max_concurrent_counties: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunnerConfig {
            counties: vec!["99".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("99"));

        let mut config = RunnerConfig::default();
        config.aggregation.degraded_fraction_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = RunnerConfig::default();
        config.report.disclaimer = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
