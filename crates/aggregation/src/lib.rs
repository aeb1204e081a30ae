//! Ward aggregation and county rollup.
//!
//! [`SpatialAggregator`] reduces seven daily grid snapshots over each ward
//! polygon of a county, producing a [`WardForecast`] per ward and variable.
//! [`rollup`] turns those into a [`CountySummary`] with county series,
//! extremes and data quality advisories.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod forecast;
pub mod index;
pub mod rollup;

pub use aggregator::{CountyAggregation, SpatialAggregator};
pub use config::{AggregationConfig, AggregationMethod};
pub use error::{AggregationError, Result};
pub use forecast::{QualityFlag, WardForecast, WardVariable, WardWeather, WeeklyAggregate};
pub use index::{GridIndex, WeightedPoint};
pub use rollup::{compass_direction, rollup, CountySeries, CountySummary, Extremes, QualityCounts, WardValue};
