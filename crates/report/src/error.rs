//! Error types for report assembly and rendering.

use thiserror::Error;

/// Every rule a report broke.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Report failed schema validation ({} violation(s)): {}",
    .violations.len(),
    .violations.join("; ")
)]
pub struct SchemaValidationError {
    pub violations: Vec<String>,
}

/// Errors that can occur while producing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
