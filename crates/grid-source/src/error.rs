//! Error types for the grid source crate.

use forecast_common::GridVariable;
use grib2_parser::Grib2Error;
use thiserror::Error;

/// The forecast file could not be turned into regional grids.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unrecognized forecast file format: {0}")]
    UnrecognizedFormat(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Malformed GRIB2 message: {0}")]
    Malformed(#[from] Grib2Error),

    #[error("Message for {parameter} at hour {hour} uses a different grid than the first message")]
    GridMismatch { parameter: String, hour: u32 },

    #[error("Message for {parameter} holds {actual} values, grid declares {expected}")]
    SizeMismatch {
        parameter: String,
        expected: usize,
        actual: usize,
    },

    #[error("Region {0} contains no grid points")]
    EmptyRegion(String),

    #[error("Required variable {0} not found in forecast file")]
    MissingVariable(GridVariable),
}

/// Fewer daily snapshots than a weekly forecast needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Only {found} of {required} daily snapshots are recoverable (missing days: {missing_days:?})")]
pub struct IncompleteDataError {
    pub found: usize,
    pub required: usize,
    pub missing_days: Vec<usize>,
}

/// Errors that can occur while sourcing grid data.
#[derive(Error, Debug)]
pub enum GridSourceError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    IncompleteData(#[from] IncompleteDataError),

    #[error("Failed to read forecast file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for grid source operations.
pub type Result<T> = std::result::Result<T, GridSourceError>;
