//! County and ward boundaries for Kenya.
//!
//! [`BoundaryStore::load`] parses a GeoJSON FeatureCollection once at start
//! up; the store is immutable afterwards and shared by reference.

pub mod error;
pub mod geometry;
pub mod knbs;
pub mod store;

pub use error::{BoundaryLoadError, Result};
pub use knbs::{CountyInfo, KNBS_COUNTIES};
pub use store::{Boundary, BoundaryLevel, BoundaryStore};

pub use geo::MultiPolygon;
