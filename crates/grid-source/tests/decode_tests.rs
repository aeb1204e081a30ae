//! Decoding synthetic multi-day GFS files.

use bytes::Bytes;
use forecast_common::{BoundingBox, GridVariable};
use grid_source::{
    DecodeError, FileProvider, ForecastProvider, GridDecoder, GridSourceConfig, GridSourceError,
};
use test_utils::{assert_approx_eq, Field, ForecastFileBuilder, Grib2Builder, KENYA_TEST_GRID};

fn decoder() -> GridDecoder {
    GridDecoder::new(GridSourceConfig::default())
}

fn required() -> Vec<GridVariable> {
    GridVariable::REQUIRED.to_vec()
}

#[test]
fn test_decode_default_week() {
    let data = ForecastFileBuilder::new().build();
    let forecast = decoder().decode(Bytes::from(data), &required()).unwrap();

    assert_eq!(forecast.snapshots.len(), 7);
    assert_eq!(forecast.metadata.model_run_id, "gfs.2026020900");
    assert_eq!(forecast.metadata.grid_points_total, KENYA_TEST_GRID.len());
    assert_approx_eq!(forecast.metadata.grid_resolution, 0.25, 1e-9);
    assert_eq!(
        forecast.first_date().unwrap().to_string(),
        "2026-02-09"
    );
    assert_eq!(forecast.snapshots[6].valid_date.to_string(), "2026-02-15");

    for snapshot in &forecast.snapshots {
        // 298.15 K
        assert_approx_eq!(snapshot.value(GridVariable::Temperature, 0, 0).unwrap(), 25.0, 0.01);
        // four 6-hourly steps of 1 mm
        assert_approx_eq!(snapshot.value(GridVariable::Rainfall, 5, 5).unwrap(), 4.0, 0.01);
        // |(3, 4)| m/s derived from the components
        assert_approx_eq!(snapshot.value(GridVariable::WindSpeed, 10, 3).unwrap(), 18.0, 0.01);
        assert_approx_eq!(snapshot.value(GridVariable::WindGust, 31, 31).unwrap(), 28.8, 0.01);
        assert_approx_eq!(snapshot.value(GridVariable::WindU, 1, 1).unwrap(), 10.8, 0.01);
        assert_approx_eq!(snapshot.value(GridVariable::WindV, 1, 1).unwrap(), 14.4, 0.01);
    }
}

#[test]
fn test_daily_reductions() {
    // temperature and gust vary through the day; rain falls only at 12z
    let data = ForecastFileBuilder::new()
        .with_values(|field, hour, _, _| match field {
            Field::Temperature => 273.15 + (hour % 24) as f32,
            Field::Precipitation => {
                if hour % 24 == 12 {
                    5.0
                } else {
                    0.0
                }
            }
            Field::Gust => (hour % 24) as f32,
            Field::WindU => 3.0,
            Field::WindV => 4.0,
            Field::WindSpeed => 5.0,
        })
        .build();
    let forecast = decoder().decode(Bytes::from(data), &required()).unwrap();
    let day = &forecast.snapshots[2];

    // hours 54, 60, 66, 72 -> 6, 12, 18, 0
    assert_approx_eq!(day.value(GridVariable::Temperature, 0, 0).unwrap(), 9.0, 0.01);
    assert_approx_eq!(day.value(GridVariable::Rainfall, 0, 0).unwrap(), 5.0, 0.01);
    assert_approx_eq!(day.value(GridVariable::WindGust, 0, 0).unwrap(), 18.0 * 3.6, 0.05);
}

#[test]
fn test_region_crop_keeps_orientation() {
    let data = ForecastFileBuilder::new()
        .with_values(|field, _, lon, lat| match field {
            Field::Temperature => 273.15 + lon as f32,
            Field::Precipitation => (lat + 5.0) as f32,
            other => test_utils::grib2::default_value(other, 0, lon, lat),
        })
        .build();

    let bbox = BoundingBox::new(36.0, -1.5, 37.0, -1.0);
    let forecast = decoder()
        .decode_region(Bytes::from(data), &bbox, &required())
        .unwrap();
    let snapshot = &forecast.snapshots[0];

    assert_eq!((snapshot.grid.nx, snapshot.grid.ny), (4, 2));
    assert_eq!(forecast.metadata.grid_points_total, 8);
    assert_approx_eq!(snapshot.grid.origin_lon, 36.125, 1e-9);
    assert_approx_eq!(snapshot.grid.origin_lat, -1.125, 1e-9);

    assert_approx_eq!(snapshot.value(GridVariable::Temperature, 0, 0).unwrap(), 36.125, 0.01);
    assert_approx_eq!(snapshot.value(GridVariable::Temperature, 3, 1).unwrap(), 36.875, 0.01);
    // 4 steps of (lat + 5) mm
    assert_approx_eq!(snapshot.value(GridVariable::Rainfall, 0, 0).unwrap(), 4.0 * 3.875, 0.05);
    assert_approx_eq!(snapshot.value(GridVariable::Rainfall, 0, 1).unwrap(), 4.0 * 3.625, 0.05);
}

/// Seven days of TMP/APCP/WIND/GUST with the given scanning mode.
fn scanned_file(scanning_mode: u8) -> Vec<u8> {
    let grid = KENYA_TEST_GRID;
    let south = grid.first_lat - (grid.nj - 1) as f64 * grid.step;
    let first_lat = if scanning_mode & 0x40 != 0 { south } else { grid.first_lat };

    let mut file = Vec::new();
    for hour in (6..=168).step_by(6) {
        let fields: [(u8, u8, u8, u32, Option<u32>, f32); 4] = [
            (0, 0, 103, 2, None, 0.0),
            (1, 8, 1, 0, Some(6), 1.0),
            (2, 1, 103, 10, None, 5.0),
            (2, 22, 1, 0, None, 8.0),
        ];
        for (category, number, level_type, level_value, interval, value) in fields {
            let mut builder = Grib2Builder::new_gfs()
                .with_grid(grid.ni, grid.nj, grid.first_lon, first_lat, grid.step)
                .with_scanning_mode(scanning_mode)
                .with_parameter(category, number)
                .with_level(level_type, level_value)
                .with_forecast_hour(hour);
            if let Some(hours) = interval {
                builder = builder.with_interval(1, hours);
            }
            let builder = if category == 0 {
                builder.with_field(|_, lat| 273.15 + lat as f32)
            } else {
                builder.with_constant_value(value)
            };
            file.extend_from_slice(&builder.build());
        }
    }
    file
}

#[test]
fn test_south_to_north_scan_is_reordered() {
    let forecast = decoder()
        .decode(Bytes::from(scanned_file(0x40)), &required())
        .unwrap();
    let snapshot = &forecast.snapshots[3];

    assert_approx_eq!(snapshot.grid.origin_lat, KENYA_TEST_GRID.first_lat, 1e-9);
    // row 0 is the northern edge
    assert_approx_eq!(
        snapshot.value(GridVariable::Temperature, 0, 0).unwrap(),
        KENYA_TEST_GRID.first_lat,
        0.01
    );
    assert_approx_eq!(snapshot.value(GridVariable::Temperature, 0, 31).unwrap(), -3.375, 0.01);
    // native WIND field, no derivation needed
    assert_approx_eq!(snapshot.value(GridVariable::WindSpeed, 0, 0).unwrap(), 18.0, 0.01);
}

#[test]
fn test_five_of_seven_days_is_incomplete() {
    let data = ForecastFileBuilder::new().with_days(5).build();
    let err = decoder().decode(Bytes::from(data), &required()).unwrap_err();

    match err {
        GridSourceError::IncompleteData(e) => {
            assert_eq!(e.found, 5);
            assert_eq!(e.required, 7);
            assert_eq!(e.missing_days, vec![5, 6]);
        }
        other => panic!("expected IncompleteDataError, got {other:?}"),
    }
}

#[test]
fn test_missing_variable() {
    let data = ForecastFileBuilder::new()
        .with_fields(vec![Field::Temperature, Field::Precipitation, Field::WindSpeed])
        .build();
    let err = decoder().decode(Bytes::from(data), &required()).unwrap_err();

    assert!(matches!(
        err,
        GridSourceError::Decode(DecodeError::MissingVariable(GridVariable::WindGust))
    ));
}

#[test]
fn test_wind_derivation_can_be_disabled() {
    let mut config = GridSourceConfig::default();
    config.derive_wind_speed = false;
    let data = ForecastFileBuilder::new().build();
    let err = GridDecoder::new(config)
        .decode(Bytes::from(data), &required())
        .unwrap_err();

    assert!(matches!(
        err,
        GridSourceError::Decode(DecodeError::MissingVariable(GridVariable::WindSpeed))
    ));
}

#[test]
fn test_unrecognized_format() {
    let err = decoder()
        .decode(Bytes::from_static(b"this is not a forecast"), &required())
        .unwrap_err();
    assert!(matches!(
        err,
        GridSourceError::Decode(DecodeError::UnrecognizedFormat(_))
    ));
}

#[test]
fn test_truncated_message_is_malformed() {
    let mut data = ForecastFileBuilder::new().with_days(1).build();
    data.truncate(100);
    let err = decoder().decode(Bytes::from(data), &required()).unwrap_err();
    assert!(matches!(err, GridSourceError::Decode(DecodeError::Malformed(_))));
}

#[test]
fn test_region_outside_grid() {
    let data = ForecastFileBuilder::new().build();
    let err = decoder()
        .decode_region(
            Bytes::from(data),
            &BoundingBox::new(10.0, 10.0, 11.0, 11.0),
            &required(),
        )
        .unwrap_err();
    assert!(matches!(err, GridSourceError::Decode(DecodeError::EmptyRegion(_))));
}

#[test]
fn test_gzip_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(&ForecastFileBuilder::new().build())
        .unwrap();
    let compressed = encoder.finish().unwrap();

    let forecast = decoder()
        .decode(Bytes::from(compressed), &required())
        .unwrap();
    assert_eq!(forecast.snapshots.len(), 7);
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
model: gfs-test
rainfall:
  parameter: PRATE
  level_type: 1
derive_wind_speed: false
"#;
    let config: GridSourceConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.model, "gfs-test");
    assert_eq!(config.rainfall.parameter, "PRATE");
    assert_eq!(config.rainfall.level_value, None);
    assert!(!config.derive_wind_speed);
    // untouched fields keep their defaults
    assert_eq!(config.temperature.parameter, "TMP");
}

#[tokio::test]
async fn test_file_provider() {
    let (_dir, path) = test_utils::write_temp_file(
        "gfs.t00z.pgrb2.0p25.grib2",
        &ForecastFileBuilder::new().build(),
    );
    let provider = FileProvider::new(&path, decoder());

    let forecast = provider
        .fetch(&BoundingBox::kenya(), &required())
        .await
        .unwrap();
    assert_eq!(forecast.snapshots.len(), 7);
    assert!(provider.describe().starts_with("file:"));
}

#[tokio::test]
async fn test_file_provider_missing_file() {
    let provider = FileProvider::new("/nonexistent/forecast.grib2", decoder());
    let err = provider
        .fetch(&BoundingBox::kenya(), &required())
        .await
        .unwrap_err();
    assert!(matches!(err, GridSourceError::Io(_)));
}

#[test]
fn test_custom_tables_replace_gfs_names() {
    use std::sync::Arc;

    // without any parameter names no message maps to a variable
    let data = ForecastFileBuilder::new().with_days(1).build();
    let err = decoder()
        .with_tables(Arc::new(grib2_parser::Grib2Tables::new()))
        .decode(Bytes::from(data), &required())
        .unwrap_err();
    assert!(matches!(
        err,
        GridSourceError::Decode(DecodeError::MissingVariable(GridVariable::Temperature))
    ));
}

/// APCP over `valid_hour - length .. valid_hour`, constant `mm`.
fn apcp(valid_hour: u32, length: u32, mm: f32) -> Vec<u8> {
    let grid = KENYA_TEST_GRID;
    Grib2Builder::new_gfs()
        .with_grid(grid.ni, grid.nj, grid.first_lon, grid.first_lat, grid.step)
        .with_parameter(1, 8)
        .with_level(1, 0)
        .with_forecast_hour(valid_hour)
        .with_interval(1, length)
        .with_constant_value(mm)
        .build()
}

#[test]
fn test_overlapping_rainfall_intervals_are_not_double_counted() {
    // 0-3 h running total and a 6-9 h step alongside the 6 h steps
    let mut data = ForecastFileBuilder::new().build();
    data.extend(apcp(3, 3, 0.5));
    data.extend(apcp(9, 3, 0.25));
    let forecast = decoder().decode(Bytes::from(data), &required()).unwrap();

    for snapshot in &forecast.snapshots {
        assert_approx_eq!(snapshot.value(GridVariable::Rainfall, 5, 5).unwrap(), 4.0, 0.01);
    }
}

#[test]
fn test_running_rainfall_totals_become_daily_amounts() {
    let builder = ForecastFileBuilder::new().with_fields(vec![
        Field::Temperature,
        Field::WindU,
        Field::WindV,
        Field::Gust,
    ]);
    let mut data = builder.build();
    for hour in builder.hours() {
        // 1 mm every 6 h, reported as the total since the run started
        data.extend(apcp(hour, hour, (hour / 6) as f32));
    }
    let forecast = decoder().decode(Bytes::from(data), &required()).unwrap();

    for snapshot in &forecast.snapshots {
        assert_approx_eq!(snapshot.value(GridVariable::Rainfall, 0, 0).unwrap(), 4.0, 0.01);
    }
}
