//! Grid snapshots to ward forecasts.

use boundaries::{Boundary, BoundaryStore};
use forecast_common::{GridSpec, GridVariable};
use grid_source::{validate_days, GridSnapshot};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::{AggregationConfig, AggregationMethod};
use crate::error::{AggregationError, Result};
use crate::forecast::{
    weekly_aggregate, DailySeries, QualityFlag, WardForecast, WardVariable, WardWeather,
};
use crate::index::{GridIndex, WeightedPoint};

/// Ward forecasts of one county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyAggregation {
    pub county_id: String,
    pub county_name: String,
    pub method: AggregationMethod,
    /// Ordered by ward id
    pub wards: Vec<WardWeather>,
}

/// Spatial reduction of one grid variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpatialReduction {
    WeightedMean,
    Max,
}

impl SpatialReduction {
    fn for_variable(variable: GridVariable) -> Self {
        match variable {
            GridVariable::WindGust => SpatialReduction::Max,
            _ => SpatialReduction::WeightedMean,
        }
    }
}

/// Reduces daily grids over ward polygons.
#[derive(Debug, Clone, Default)]
pub struct SpatialAggregator {
    config: AggregationConfig,
}

impl SpatialAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregate every ward of `county_id`.
    ///
    /// Wards outside the grid come back `missing`; the call fails only when
    /// no ward of the county receives a point.
    #[instrument(skip(self, store, snapshots), fields(method = self.config.method.as_str()))]
    pub fn aggregate(
        &self,
        store: &BoundaryStore,
        county_id: &str,
        snapshots: &[GridSnapshot],
    ) -> Result<CountyAggregation> {
        let county = store
            .county(county_id)
            .ok_or_else(|| AggregationError::UnknownCounty(county_id.to_string()))?;
        let wards = store.wards_of(county_id);
        if wards.is_empty() {
            return Err(AggregationError::NoWards(county_id.to_string()));
        }

        validate_days(snapshots)?;
        let mut days: Vec<&GridSnapshot> = snapshots.iter().collect();
        days.sort_by_key(|s| s.day_index);
        days.dedup_by_key(|s| s.day_index);

        let grid: GridSpec = days[0].grid.clone();
        if let Some(other) = days.iter().find(|s| s.grid != grid) {
            return Err(AggregationError::InconsistentGrid {
                day: other.day_index,
            });
        }
        let index = GridIndex::new(grid);

        let results: Vec<WardWeather> = wards
            .par_iter()
            .map(|ward| self.aggregate_ward(ward, &index, &days))
            .collect();

        if results.iter().all(|w| w.grid_points_used() == 0) {
            return Err(AggregationError::OutsideGrid(county_id.to_string()));
        }

        let missing = results
            .iter()
            .filter(|w| w.quality_flag() == QualityFlag::Missing)
            .count();
        info!(
            county_id,
            wards = results.len(),
            missing,
            "Aggregated county wards"
        );

        Ok(CountyAggregation {
            county_id: county.id.clone(),
            county_name: county.name.clone(),
            method: self.config.method,
            wards: results,
        })
    }

    fn aggregate_ward(&self, ward: &Boundary, index: &GridIndex, days: &[&GridSnapshot]) -> WardWeather {
        let points = index.ward_points(ward, self.config.method);
        debug!(ward_id = %ward.id, candidates = points.len(), "Ward grid points");

        let temperature = self.series(&points, days, GridVariable::Temperature);
        let rainfall = self.series(&points, days, GridVariable::Rainfall);
        let speed = self.series(&points, days, GridVariable::WindSpeed);
        let gust = self.series(&points, days, GridVariable::WindGust);
        let wind_u = self.series(&points, days, GridVariable::WindU);
        let wind_v = self.series(&points, days, GridVariable::WindV);

        let temperature = self.forecast(ward, WardVariable::Temperature, temperature.0, DailySeries::new(temperature.1));
        let rainfall = self.forecast(ward, WardVariable::Rainfall, rainfall.0, DailySeries::new(rainfall.1));

        let has_components = wind_u.0 > 0 && wind_v.0 > 0;
        let wind_series = DailySeries {
            values: speed.1,
            gusts: Some(gust.1),
            wind_u: has_components.then_some(wind_u.1),
            wind_v: has_components.then_some(wind_v.1),
        };
        let wind = self.forecast(ward, WardVariable::Wind, speed.0, wind_series);

        WardWeather {
            ward_id: ward.id.clone(),
            ward_name: ward.name.clone(),
            temperature,
            rainfall,
            wind,
        }
    }

    fn forecast(
        &self,
        ward: &Boundary,
        variable: WardVariable,
        grid_points_used: usize,
        series: DailySeries,
    ) -> WardForecast {
        if grid_points_used == 0 {
            return WardForecast::missing(&ward.id, &ward.name, variable);
        }
        let weekly = weekly_aggregate(variable, &series, self.config.rainy_day_threshold_mm);
        WardForecast {
            ward_id: ward.id.clone(),
            ward_name: ward.name.clone(),
            variable,
            quality_flag: QualityFlag::classify(
                grid_points_used,
                self.config.min_grid_points,
                &series.values,
            ),
            daily: series.values,
            weekly,
            grid_points_used,
        }
    }

    /// Daily ward values of one variable and the number of points that
    /// carried a value on at least one day.
    fn series(
        &self,
        points: &[WeightedPoint],
        days: &[&GridSnapshot],
        variable: GridVariable,
    ) -> (usize, Vec<Option<f64>>) {
        let reduction = SpatialReduction::for_variable(variable);
        let mut contributed = vec![false; points.len()];

        let daily = days
            .iter()
            .map(|snapshot| {
                let field = snapshot.field(variable)?;
                let mut weighted = 0.0;
                let mut weights = 0.0;
                let mut max: Option<f64> = None;

                for (point, seen) in points.iter().zip(contributed.iter_mut()) {
                    let Some(value) = field.get(point.index).copied().filter(|v| v.is_finite()) else {
                        continue;
                    };
                    let value = value as f64;
                    *seen = true;
                    weighted += value * point.weight;
                    weights += point.weight;
                    max = Some(max.map_or(value, |m| m.max(value)));
                }

                match reduction {
                    SpatialReduction::WeightedMean if weights > 0.0 => Some(weighted / weights),
                    SpatialReduction::WeightedMean => None,
                    SpatialReduction::Max => max,
                }
            })
            .collect();

        (contributed.iter().filter(|c| **c).count(), daily)
    }
}
