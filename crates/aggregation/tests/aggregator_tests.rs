//! Spatial aggregation over synthetic wards.

mod common;

use aggregation::{
    AggregationConfig, AggregationError, AggregationMethod, QualityFlag, SpatialAggregator,
};
use common::*;
use forecast_common::GridVariable;
use test_utils::assert_approx_eq;

fn aggregator() -> SpatialAggregator {
    SpatialAggregator::new(AggregationConfig::default())
}

#[test]
fn test_constant_fields() {
    let store = fixture_store();
    let result = aggregator()
        .aggregate(&store, "01", &week_with(constant))
        .unwrap();

    assert_eq!(result.county_name, "Mombasa");
    let ids: Vec<&str> = result.wards.iter().map(|w| w.ward_id.as_str()).collect();
    assert_eq!(ids, vec!["0101", "0102", "0103", "0104"]);

    for ward in &result.wards {
        assert_eq!(ward.quality_flag(), QualityFlag::Good);
        assert_eq!(ward.grid_points_used(), 4);

        assert_approx_eq!(ward.temperature.weekly.mean.unwrap(), 25.0, 1e-9);
        assert_eq!(ward.rainfall.daily.len(), 7);
        assert_approx_eq!(ward.rainfall.weekly.total.unwrap(), 28.0, 1e-9);
        assert_eq!(ward.rainfall.weekly.rainy_days, Some(7));
        assert_approx_eq!(ward.wind.weekly.mean.unwrap(), 18.0, 1e-9);
        assert_approx_eq!(ward.wind.weekly.max_gust.unwrap(), 28.8, 1e-5);
        assert!(ward.wind.weekly.max_gust >= ward.wind.weekly.mean);
    }
}

#[test]
fn test_five_wards_one_without_points() {
    let store = five_ward_store();
    let result = aggregator()
        .aggregate(&store, "01", &week_with(constant))
        .unwrap();

    assert_eq!(result.wards.len(), 5);
    let empty = &result.wards[4];
    assert_eq!(empty.ward_id, "0105");
    assert_eq!(empty.quality_flag(), QualityFlag::Missing);
    assert_eq!(empty.grid_points_used(), 0);
    assert!(empty.rainfall.daily.iter().all(Option::is_none));
    assert_eq!(empty.rainfall.weekly.total, None);

    for ward in &result.wards[..4] {
        assert_eq!(ward.quality_flag(), QualityFlag::Good);
    }
}

#[test]
fn test_gust_is_spatial_max() {
    let store = fixture_store();
    let snapshots = week_with(|variable, _, _, lat| match variable {
        GridVariable::WindGust => (lat * 10.0) as f32,
        other => constant(other, 0, 0.0, 0.0),
    });
    let result = aggregator().aggregate(&store, "01", &snapshots).unwrap();

    // ward 0101 covers latitudes 3.125 .. 3.875
    let gusts = result.wards[0].wind.weekly.daily_peak.as_ref().unwrap();
    assert_approx_eq!(gusts[0].unwrap(), 38.75, 1e-4);
}

#[test]
fn test_masked_points_do_not_contribute() {
    let store = fixture_store();
    // the northern half of ward 0101 is masked for rainfall
    let snapshots = week_with(|variable, _, lon, lat| match variable {
        GridVariable::Rainfall if lon < 34.25 && lat > 3.5 => f32::NAN,
        GridVariable::Rainfall if lon < 34.25 => 6.0,
        other => constant(other, 0, lon, lat),
    });
    let result = aggregator().aggregate(&store, "01", &snapshots).unwrap();
    let ward = &result.wards[0];

    assert_eq!(ward.rainfall.grid_points_used, 2);
    assert_approx_eq!(ward.rainfall.daily[0].unwrap(), 6.0, 1e-9);
    assert_eq!(ward.temperature.grid_points_used, 4);
    assert_eq!(ward.grid_points_used(), 2);
}

#[test]
fn test_min_grid_points_degrades() {
    let store = fixture_store();
    let config = AggregationConfig {
        min_grid_points: 5,
        ..Default::default()
    };
    let result = SpatialAggregator::new(config)
        .aggregate(&store, "01", &week_with(constant))
        .unwrap();
    assert!(result
        .wards
        .iter()
        .all(|w| w.quality_flag() == QualityFlag::Degraded));
}

#[test]
fn test_missing_day_value_degrades() {
    let store = fixture_store();
    let snapshots = week_with(|variable, day, lon, lat| match variable {
        GridVariable::Temperature if day == 3 => f32::NAN,
        other => constant(other, day, lon, lat),
    });
    let result = aggregator().aggregate(&store, "01", &snapshots).unwrap();
    let ward = &result.wards[0];

    assert_eq!(ward.temperature.daily[3], None);
    assert_eq!(ward.temperature.quality_flag, QualityFlag::Degraded);
    assert_eq!(ward.rainfall.quality_flag, QualityFlag::Good);
    assert_eq!(ward.quality_flag(), QualityFlag::Degraded);
}

#[test]
fn test_area_weighted_matches_cell_values() {
    let store = fixture_store();
    let config = AggregationConfig {
        method: AggregationMethod::AreaWeighted,
        ..Default::default()
    };
    let snapshots = week_with(|variable, _, lon, lat| match variable {
        GridVariable::Temperature => lon as f32,
        other => constant(other, 0, lon, lat),
    });
    let result = SpatialAggregator::new(config)
        .aggregate(&store, "01", &snapshots)
        .unwrap();

    // each strip is exactly one column of cells
    assert_approx_eq!(result.wards[0].temperature.daily[0].unwrap(), 34.125, 1e-5);
    assert_approx_eq!(result.wards[3].temperature.daily[0].unwrap(), 34.875, 1e-5);
    assert_eq!(result.wards[0].temperature.grid_points_used, 4);
    assert_eq!(result.method, AggregationMethod::AreaWeighted);
}

#[test]
fn test_area_weights_cover_ward_area() {
    use aggregation::GridIndex;

    let store = fixture_store();
    let index = GridIndex::new(test_grid());
    let ward = store.ward("0101").unwrap();

    let points = index.ward_points(ward, AggregationMethod::AreaWeighted);
    let total: f64 = points.iter().map(|p| p.weight).sum();
    // 0.25 x 1 degree ward over 0.25 x 0.25 degree cells
    assert_approx_eq!(total, 4.0, 1e-9);

    // a ward straddling cell edges picks up fractional weights
    let store = store_with_wards(vec![ward_feature_offset()]);
    let ward = store.ward("0101").unwrap();
    let points = index.ward_points(ward, AggregationMethod::AreaWeighted);
    let total: f64 = points.iter().map(|p| p.weight).sum();
    assert_approx_eq!(total, 4.0, 1e-9);
    assert!(points.iter().any(|p| p.weight < 1.0));
}

fn ward_feature_offset() -> serde_json::Value {
    ward("0101", "01", (34.1, 3.1, 34.35, 4.1))
}

#[test]
fn test_ward_outside_grid_is_missing() {
    let store = store_with_wards(vec![
        ward("0201", "02", (35.0, 3.0, 35.5, 4.0)),
        ward("0202", "02", (50.0, 3.0, 50.5, 4.0)),
    ]);
    let result = aggregator()
        .aggregate(&store, "02", &week_with(constant))
        .unwrap();

    assert_eq!(result.wards[0].quality_flag(), QualityFlag::Good);
    assert_eq!(result.wards[1].quality_flag(), QualityFlag::Missing);
    assert_eq!(result.wards[1].temperature.weekly.mean, None);
}

#[test]
fn test_all_wards_outside_grid() {
    let store = store_with_wards(vec![ward("0201", "02", (50.0, 3.0, 50.5, 4.0))]);
    let err = aggregator()
        .aggregate(&store, "02", &week_with(constant))
        .unwrap_err();
    assert!(matches!(err, AggregationError::OutsideGrid(ref id) if id == "02"));
}

#[test]
fn test_county_errors() {
    let store = fixture_store();
    let snapshots = week_with(constant);
    assert!(matches!(
        aggregator().aggregate(&store, "99", &snapshots).unwrap_err(),
        AggregationError::UnknownCounty(_)
    ));

    let bare = store_with_wards(vec![]);
    assert!(matches!(
        aggregator().aggregate(&bare, "01", &snapshots).unwrap_err(),
        AggregationError::NoWards(_)
    ));
}

#[test]
fn test_five_days_is_incomplete() {
    let store = fixture_store();
    let err = aggregator()
        .aggregate(&store, "01", &days_with(5, constant))
        .unwrap_err();
    match err {
        AggregationError::IncompleteData(e) => assert_eq!(e.found, 5),
        other => panic!("expected incomplete data, got {other:?}"),
    }
}
