//! Ward table as CSV.

use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::schema::CountyWeatherReport;
use crate::validate::validate;

pub const CSV_HEADER: [&str; 10] = [
    "schema_version",
    "county_id",
    "county_name",
    "ward_id",
    "ward_name",
    "rainfall_total",
    "temp_mean",
    "temp_max",
    "temp_min",
    "wind_max",
];

/// One ward line. Missing values serialize as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub schema_version: String,
    pub county_id: String,
    pub county_name: String,
    pub ward_id: String,
    pub ward_name: String,
    pub rainfall_total: Option<f64>,
    pub temp_mean: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub wind_max: Option<f64>,
}

pub fn csv_rows(report: &CountyWeatherReport) -> Vec<CsvRow> {
    report
        .wards
        .iter()
        .map(|ward| CsvRow {
            schema_version: report.schema_version.clone(),
            county_id: report.county_id.clone(),
            county_name: report.county_name.clone(),
            ward_id: ward.ward_id.clone(),
            ward_name: ward.ward_name.clone(),
            rainfall_total: ward.rainfall_total.map(round2),
            temp_mean: ward.temp_mean.map(round2),
            temp_max: ward.temp_max.map(round2),
            temp_min: ward.temp_min.map(round2),
            wind_max: ward.wind_max.map(round2),
        })
        .collect()
}

/// Header plus one row per ward; header only for a report without wards.
pub fn to_csv(report: &CountyWeatherReport) -> Result<String> {
    validate(report)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in csv_rows(report) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
