//! County Weather Report document.

use aggregation::{Extremes, QualityFlag, WardValue, WeeklyAggregate};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0";

/// Weekly outlook for one county. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyWeatherReport {
    pub schema_version: String,
    pub county_id: String,
    pub county_name: String,
    pub title: String,
    pub period: PeriodInfo,
    pub variables: Variables,
    /// Ordered by ward id
    #[serde(default)]
    pub wards: Vec<WardSummary>,
    pub extremes: Extremes,
    pub narrative: Narrative,
    pub metadata: ReportMetadata,
    pub disclaimer: String,
    pub quality_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub week_number: u32,
    pub year: i32,
    pub formatted: String,
}

/// One forecast day of a county series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub day: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    pub temperature: TemperatureOutlook,
    pub rainfall: RainfallOutlook,
    pub wind: WindOutlook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureOutlook {
    pub units: String,
    pub weekly: WeeklyAggregate,
    pub daily: Vec<DailyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallOutlook {
    pub units: String,
    pub weekly: WeeklyAggregate,
    pub daily: Vec<DailyValue>,
    pub top_wards: Vec<WardValue>,
    pub flood_risk_wards: Vec<WardValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindOutlook {
    pub units: String,
    pub weekly: WeeklyAggregate,
    /// Mean speed per day
    pub daily: Vec<DailyValue>,
    /// County maximum gust per day
    pub daily_peak: Vec<DailyValue>,
    pub dominant_direction: Option<String>,
    pub windiest_wards: Vec<WardValue>,
}

/// One ward row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardSummary {
    pub ward_id: String,
    pub ward_name: String,
    pub rainfall_total: Option<f64>,
    pub rainy_days: Option<u32>,
    pub peak_rainfall_day: Option<String>,
    pub temp_mean: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub wind_mean: Option<f64>,
    pub wind_max: Option<f64>,
    pub daily_rainfall: Vec<Option<f64>>,
    pub daily_temperature: Vec<Option<f64>>,
    pub daily_wind: Vec<Option<f64>>,
    pub grid_points_used: usize,
    pub quality_flag: QualityFlag,
}

/// Template text derived from the report values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub summary: String,
    pub early_week: String,
    pub mid_week: String,
    pub late_week: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub model_run_id: String,
    pub generated_at: DateTime<Utc>,
    pub grid_resolution: f64,
    pub grid_points_total: usize,
    pub data_source: String,
    pub aggregation_method: String,
    pub system_version: String,
}
