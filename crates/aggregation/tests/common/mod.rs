//! Snapshot and boundary helpers shared by the aggregation tests.

#![allow(dead_code)]

use boundaries::BoundaryStore;
use chrono::{Duration, NaiveDate};
use forecast_common::{GridSpec, GridVariable};
use grid_source::GridSnapshot;
use serde_json::Value;
use test_utils::boundaries::{feature_collection, polygon_feature, rectangle_ring};
use test_utils::{BoundaryFixture, KENYA_TEST_GRID};

pub const ALL_VARIABLES: [GridVariable; 6] = [
    GridVariable::Temperature,
    GridVariable::Rainfall,
    GridVariable::WindSpeed,
    GridVariable::WindGust,
    GridVariable::WindU,
    GridVariable::WindV,
];

pub fn test_grid() -> GridSpec {
    let layout = KENYA_TEST_GRID;
    GridSpec::new(
        layout.ni as usize,
        layout.nj as usize,
        layout.step,
        layout.step,
        layout.first_lon,
        layout.first_lat,
    )
}

/// Seven snapshots whose values come from f(variable, day, lon, lat).
pub fn week_with(f: impl Fn(GridVariable, usize, f64, f64) -> f32) -> Vec<GridSnapshot> {
    days_with(7, f)
}

pub fn days_with(days: usize, f: impl Fn(GridVariable, usize, f64, f64) -> f32) -> Vec<GridSnapshot> {
    let grid = test_grid();
    let start = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
    (0..days)
        .map(|day| {
            let mut snapshot = GridSnapshot::new(day, start + Duration::days(day as i64), grid.clone());
            for variable in ALL_VARIABLES {
                let values: Vec<f32> = (0..grid.ny)
                    .flat_map(|j| (0..grid.nx).map(move |i| (i, j)))
                    .map(|(i, j)| f(variable, day, grid.lon(i), grid.lat(j)))
                    .collect();
                snapshot = snapshot.with_values(variable, values);
            }
            snapshot
        })
        .collect()
}

/// 25 C, 4 mm/day, 18 km/h wind from the south-west, 28.8 km/h gusts.
pub fn constant(variable: GridVariable, _day: usize, _lon: f64, _lat: f64) -> f32 {
    match variable {
        GridVariable::Temperature => 25.0,
        GridVariable::Rainfall => 4.0,
        GridVariable::WindSpeed => 18.0,
        GridVariable::WindGust => 28.8,
        GridVariable::WindU => 10.8,
        GridVariable::WindV => 14.4,
    }
}

pub fn fixture_store() -> BoundaryStore {
    BoundaryStore::load(&BoundaryFixture::default().geojson()).unwrap()
}

/// All 47 counties plus the given wards.
pub fn store_with_wards(wards: Vec<Value>) -> BoundaryStore {
    let mut features = BoundaryFixture::default().county_features();
    features.extend(wards);
    BoundaryStore::load(&feature_collection(features)).unwrap()
}

pub fn ward(id: &str, parent: &str, bounds: (f64, f64, f64, f64)) -> Value {
    let (a, b, c, d) = bounds;
    polygon_feature(id, &format!("Ward {id}"), "ward", Some(parent), rectangle_ring(a, b, c, d))
}

/// County 01's four fixture strips plus a fifth ward between grid points.
pub fn five_ward_store() -> BoundaryStore {
    let fixture = BoundaryFixture::default();
    let mut wards: Vec<Value> = (1..=4)
        .map(|n| ward(&BoundaryFixture::ward_id(1, n), "01", fixture.ward_bounds(1, n)))
        .collect();
    wards.push(ward("0105", "01", (34.9, 3.9, 34.95, 3.95)));
    store_with_wards(wards)
}
