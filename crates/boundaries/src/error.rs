//! Error types for boundary loading.

use thiserror::Error;

/// Boundary definitions could not be loaded into a valid store.
#[derive(Error, Debug)]
pub enum BoundaryLoadError {
    #[error("Failed to read boundary file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed boundary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a GeoJSON FeatureCollection, found {0}")]
    NotFeatureCollection(String),

    #[error("Feature {index} is missing property {property}")]
    MissingProperty { index: usize, property: &'static str },

    #[error("Boundary {id} has unknown level {level:?} (expected county or ward)")]
    InvalidLevel { id: String, level: String },

    #[error("Boundary {id} has invalid geometry: {reason}")]
    InvalidGeometry { id: String, reason: String },

    #[error("Duplicate boundary id {0}")]
    DuplicateId(String),

    #[error("County id {0} is not a KNBS county code")]
    UnknownCounty(String),

    #[error("Boundary set is missing counties: {}", .0.join(", "))]
    MissingCounties(Vec<String>),

    #[error("Ward {ward_id} references unknown county {parent_id:?}")]
    OrphanWard {
        ward_id: String,
        parent_id: Option<String>,
    },
}

/// Result type for boundary operations.
pub type Result<T> = std::result::Result<T, BoundaryLoadError>;
