//! Aggregation and rollup settings.

use serde::{Deserialize, Serialize};

/// How grid points are attributed to a ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Every grid point inside the polygon counts once
    #[default]
    PointInPolygon,
    /// Every cell overlapping the polygon counts by its overlapped fraction
    AreaWeighted,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::PointInPolygon => "point_in_polygon",
            AggregationMethod::AreaWeighted => "area_weighted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub method: AggregationMethod,
    /// Wards with fewer contributing points are flagged degraded
    pub min_grid_points: usize,
    /// Daily rainfall at or above this counts as a rainy day (mm)
    pub rainy_day_threshold_mm: f64,
    /// Weekly ward rainfall above this puts the ward on the flood risk list (mm)
    pub flood_risk_threshold_mm: f64,
    /// Share of wards not `good` above which the county gets an advisory
    pub degraded_fraction_threshold: f64,
    pub top_rainfall_wards: usize,
    pub flood_risk_wards: usize,
    pub windiest_wards: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            method: AggregationMethod::PointInPolygon,
            min_grid_points: 2,
            rainy_day_threshold_mm: 1.0,
            flood_risk_threshold_mm: 50.0,
            degraded_fraction_threshold: 0.10,
            top_rainfall_wards: 10,
            flood_risk_wards: 5,
            windiest_wards: 5,
        }
    }
}
