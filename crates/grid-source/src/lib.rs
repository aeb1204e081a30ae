//! Grid data source for the ward forecast pipeline.
//!
//! Turns a GFS GRIB2 forecast file into seven [`GridSnapshot`]s, one per
//! forecast day, cropped to the target region and converted to report
//! units (deg C, mm, km/h).

pub mod config;
pub mod decoder;
pub mod error;
pub mod provider;
pub mod snapshot;

pub use config::{GridSourceConfig, UnitConversion, VariableSource};
pub use decoder::{decompress_gzip, forecast_day, is_gzip, validate_days, GridDecoder};
pub use error::{DecodeError, GridSourceError, IncompleteDataError, Result};
pub use provider::{FileProvider, ForecastProvider};
pub use snapshot::{ForecastGrid, ForecastMetadata, GridPoint, GridSnapshot};
