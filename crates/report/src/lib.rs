//! County Weather Report assembly and rendering.
//!
//! [`ReportAssembler`] turns a county summary into a validated
//! [`CountyWeatherReport`], which renders to JSON, CSV and PDF. Every
//! renderer runs [`validate`] first, so an invalid report is never
//! persisted.

pub mod assemble;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod narrative;
pub mod pdf;
pub mod schema;
pub mod validate;

pub use assemble::{AssemblyInput, ReportAssembler};
pub use config::{ReportConfig, DEFAULT_DISCLAIMER};
pub use csv_export::{csv_rows, to_csv, CsvRow, CSV_HEADER};
pub use error::{ReportError, Result, SchemaValidationError};
pub use pdf::render_pdf;
pub use schema::{
    CountyWeatherReport, DailyValue, Narrative, PeriodInfo, RainfallOutlook, ReportMetadata,
    TemperatureOutlook, Variables, WardSummary, WindOutlook, SCHEMA_VERSION,
};
pub use validate::validate;

/// Validate and pretty-print as JSON.
pub fn to_json(report: &CountyWeatherReport) -> Result<String> {
    validate(report)?;
    Ok(serde_json::to_string_pretty(report)?)
}

impl ReportAssembler {
    /// Validate and render as PDF with this assembler's map settings.
    pub fn to_pdf(&self, report: &CountyWeatherReport) -> Result<Vec<u8>> {
        render_pdf(report, self.config())
    }
}
