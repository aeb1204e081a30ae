//! Error types for aggregation.

use grid_source::IncompleteDataError;
use thiserror::Error;

/// A county could not be aggregated.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Unknown county {0}")]
    UnknownCounty(String),

    #[error("County {0} has no wards")]
    NoWards(String),

    #[error("No ward of county {0} contains any grid point")]
    OutsideGrid(String),

    #[error("Snapshot for day {day} uses a different grid than day 0")]
    InconsistentGrid { day: usize },

    #[error(transparent)]
    IncompleteData(#[from] IncompleteDataError),

    #[error("Aggregation of county {county_id} timed out after {seconds}s")]
    Timeout { county_id: String, seconds: u64 },
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;
