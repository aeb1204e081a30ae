//! Daily regional grids.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use forecast_common::{GridSpec, GridVariable};
use serde::{Deserialize, Serialize};

/// One grid point of a snapshot, borrowed from its arrays.
#[derive(Debug, Clone, Copy)]
pub struct GridPoint<'a> {
    /// Canonical column (west to east)
    pub i: usize,
    /// Canonical row (north to south)
    pub j: usize,
    pub latitude: f64,
    pub longitude: f64,
    snapshot: &'a GridSnapshot,
}

impl GridPoint<'_> {
    /// Value of `variable` at this point; `None` when absent or masked.
    pub fn value(&self, variable: GridVariable) -> Option<f64> {
        self.snapshot.value(variable, self.i, self.j)
    }
}

/// All variables of one forecast day over the target region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Day offset from the start of the forecast (0-based)
    pub day_index: usize,
    pub valid_date: NaiveDate,
    pub grid: GridSpec,
    /// Row-major values per variable; `NaN` marks missing data
    pub values: BTreeMap<GridVariable, Vec<f32>>,
}

impl GridSnapshot {
    pub fn new(day_index: usize, valid_date: NaiveDate, grid: GridSpec) -> Self {
        Self {
            day_index,
            valid_date,
            grid,
            values: BTreeMap::new(),
        }
    }

    /// Attach a field; its length must match the grid.
    pub fn with_values(mut self, variable: GridVariable, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), self.grid.len());
        self.values.insert(variable, values);
        self
    }

    pub fn has(&self, variable: GridVariable) -> bool {
        self.values.contains_key(&variable)
    }

    pub fn field(&self, variable: GridVariable) -> Option<&[f32]> {
        self.values.get(&variable).map(Vec::as_slice)
    }

    pub fn value(&self, variable: GridVariable, i: usize, j: usize) -> Option<f64> {
        if i >= self.grid.nx || j >= self.grid.ny {
            return None;
        }
        let v = *self.values.get(&variable)?.get(self.grid.flat_index(i, j))?;
        v.is_finite().then_some(v as f64)
    }

    /// Iterate the points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = GridPoint<'_>> + '_ {
        (0..self.grid.ny).flat_map(move |j| {
            (0..self.grid.nx).map(move |i| GridPoint {
                i,
                j,
                latitude: self.grid.lat(j),
                longitude: self.grid.lon(i),
                snapshot: self,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }
}

/// Provenance of a decoded forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    /// e.g. "gfs.2026020900"
    pub model_run_id: String,
    pub reference_time: DateTime<Utc>,
    /// Grid spacing in degrees
    pub grid_resolution: f64,
    /// Grid points inside the region
    pub grid_points_total: usize,
}

/// Seven daily snapshots of one model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastGrid {
    pub metadata: ForecastMetadata,
    pub snapshots: Vec<GridSnapshot>,
}

impl ForecastGrid {
    /// Regional grid shared by every snapshot.
    pub fn grid(&self) -> Option<&GridSpec> {
        self.snapshots.first().map(|s| &s.grid)
    }

    /// Date of the first forecast day.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.valid_date)
    }

    /// True when every snapshot carries `variable`.
    pub fn has(&self, variable: GridVariable) -> bool {
        !self.snapshots.is_empty() && self.snapshots.iter().all(|s| s.has(variable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GridSnapshot {
        let grid = GridSpec::new(3, 2, 0.25, 0.25, 36.0, -1.0);
        GridSnapshot::new(0, NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(), grid).with_values(
            GridVariable::Temperature,
            vec![20.0, 21.0, 22.0, 23.0, f32::NAN, 25.0],
        )
    }

    #[test]
    fn test_points_are_row_major() {
        let snap = snapshot();
        let points: Vec<_> = snap.points().collect();
        assert_eq!(points.len(), 6);
        assert_eq!((points[1].i, points[1].j), (1, 0));
        assert_eq!(points[3].latitude, -1.25);
        assert_eq!(points[2].longitude, 36.5);
        assert_eq!(points[5].value(GridVariable::Temperature), Some(25.0));
    }

    #[test]
    fn test_masked_and_absent_values() {
        let snap = snapshot();
        assert_eq!(snap.value(GridVariable::Temperature, 1, 1), None);
        assert_eq!(snap.value(GridVariable::Rainfall, 0, 0), None);
        assert_eq!(snap.value(GridVariable::Temperature, 3, 0), None);
    }
}
