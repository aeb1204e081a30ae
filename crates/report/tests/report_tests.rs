//! Report assembly, validation and rendering over a fixture county.

use aggregation::{
    rollup, AggregationConfig, CountyAggregation, CountySummary, QualityFlag, SpatialAggregator,
};
use boundaries::BoundaryStore;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use forecast_common::{GridSpec, GridVariable, ReportPeriod};
use grid_source::{ForecastMetadata, GridSnapshot};
use report::{
    csv_rows, to_csv, to_json, validate, AssemblyInput, CountyWeatherReport, ReportAssembler,
    ReportConfig, ReportError, CSV_HEADER,
};
use test_utils::{BoundaryFixture, KENYA_TEST_GRID};

const VARIABLES: [GridVariable; 6] = [
    GridVariable::Temperature,
    GridVariable::Rainfall,
    GridVariable::WindSpeed,
    GridVariable::WindGust,
    GridVariable::WindU,
    GridVariable::WindV,
];

fn week(rain: impl Fn(usize, f64) -> f32) -> Vec<GridSnapshot> {
    let layout = KENYA_TEST_GRID;
    let grid = GridSpec::new(
        layout.ni as usize,
        layout.nj as usize,
        layout.step,
        layout.step,
        layout.first_lon,
        layout.first_lat,
    );
    let start = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
    (0..7)
        .map(|day| {
            let mut snapshot = GridSnapshot::new(day, start + Duration::days(day as i64), grid.clone());
            for variable in VARIABLES {
                let values = (0..grid.ny)
                    .flat_map(|j| (0..grid.nx).map(move |i| (i, j)))
                    .map(|(i, _)| {
                        let lon = grid.lon(i);
                        match variable {
                            GridVariable::Temperature => 24.0 + day as f32,
                            GridVariable::Rainfall => rain(day, lon),
                            GridVariable::WindSpeed => 18.0,
                            GridVariable::WindGust => 30.0,
                            GridVariable::WindU => 10.8,
                            GridVariable::WindV => 14.4,
                        }
                    })
                    .collect();
                snapshot = snapshot.with_values(variable, values);
            }
            snapshot
        })
        .collect()
}

fn metadata() -> ForecastMetadata {
    ForecastMetadata {
        model_run_id: "gfs.2026020900".to_string(),
        reference_time: Utc.with_ymd_and_hms(2026, 2, 9, 0, 0, 0).unwrap(),
        grid_resolution: 0.25,
        grid_points_total: KENYA_TEST_GRID.len(),
    }
}

struct Fixture {
    aggregation: CountyAggregation,
    summary: CountySummary,
    metadata: ForecastMetadata,
    period: ReportPeriod,
}

impl Fixture {
    fn new(rain: impl Fn(usize, f64) -> f32) -> Self {
        let store = BoundaryStore::load(&BoundaryFixture::default().geojson()).unwrap();
        let config = AggregationConfig::default();
        let aggregation = SpatialAggregator::new(config.clone())
            .aggregate(&store, "01", &week(rain))
            .unwrap();
        let summary = rollup(&aggregation, &config);
        Self {
            aggregation,
            summary,
            metadata: metadata(),
            period: ReportPeriod::iso_week(2026, 7).unwrap(),
        }
    }

    fn input(&self) -> AssemblyInput<'_> {
        AssemblyInput {
            summary: &self.summary,
            wards: &self.aggregation.wards,
            period: self.period,
            metadata: &self.metadata,
            method: self.aggregation.method,
        }
    }

    fn report(&self) -> CountyWeatherReport {
        let at = Utc.with_ymd_and_hms(2026, 2, 9, 6, 0, 0).unwrap();
        ReportAssembler::default().assemble_at(self.input(), at).unwrap()
    }
}

/// Rain increasing eastwards so wards differ.
fn east_wetter(day: usize, lon: f64) -> f32 {
    if day == 2 {
        ((lon - 34.0) * 20.0) as f32
    } else {
        1.5
    }
}

#[test]
fn test_assembled_report() {
    let fixture = Fixture::new(east_wetter);
    let report = fixture.report();

    assert_eq!(report.schema_version, "1.0");
    assert_eq!(report.county_id, "01");
    assert_eq!(report.county_name, "Mombasa");
    assert_eq!(report.title, "Weekly Weather Outlook for Mombasa County");
    assert_eq!(report.period.formatted, "Week 7, 2026 (February 09 - February 15, 2026)");
    assert_eq!(report.metadata.model_run_id, "gfs.2026020900");
    assert_eq!(report.metadata.data_source, "GFS");
    assert_eq!(report.metadata.aggregation_method, "point_in_polygon");
    assert!(!report.disclaimer.is_empty());

    assert_eq!(report.wards.len(), 4);
    assert!(report.wards.iter().all(|w| w.quality_flag == QualityFlag::Good));
    assert_eq!(report.variables.rainfall.daily.len(), 7);
    assert_eq!(report.variables.rainfall.daily[2].day, "Wednesday");
    assert_eq!(report.variables.wind.daily_peak.len(), 7);
    assert!(report.variables.wind.weekly.daily_peak.is_none());
    assert_eq!(report.variables.wind.dominant_direction.as_deref(), Some("SW"));

    // the easternmost strip is wettest
    let wettest = report.extremes.highest_rainfall.as_ref().unwrap();
    assert_eq!(wettest.ward_id, "0104");
    assert_eq!(report.wards[3].peak_rainfall_day.as_deref(), Some("Wednesday"));
    assert_eq!(report.variables.rainfall.top_wards[0].ward_id, "0104");

    assert!(report
        .narrative
        .highlights
        .iter()
        .any(|h| h.starts_with("Wettest day: Wednesday")));
    assert!(report.narrative.summary.starts_with("Mombasa County can expect"));
    assert!(report.narrative.early_week.starts_with("Early week (Monday to Wednesday)"));
}

#[test]
fn test_json_output() {
    let report = Fixture::new(east_wetter).report();
    let json = to_json(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["schema_version"], "1.0");
    assert_eq!(value["county_id"], "01");
    assert_eq!(value["period"]["week_number"], 7);
    assert_eq!(value["wards"].as_array().unwrap().len(), 4);
    assert!(value["extremes"]["coolest_ward"]["ward_id"].is_string());

    let parsed: CountyWeatherReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_assemble_is_idempotent_apart_from_generated_at() {
    let fixture = Fixture::new(east_wetter);
    let assembler = ReportAssembler::default();

    let first = assembler.assemble(fixture.input()).unwrap();
    let mut second = assembler.assemble(fixture.input()).unwrap();
    second.metadata.generated_at = first.metadata.generated_at;
    assert_eq!(first, second);

    assert_eq!(fixture.report(), fixture.report());
}

#[test]
fn test_csv_one_row_per_ward() {
    let report = Fixture::new(east_wetter).report();
    let rows = csv_rows(&report);
    assert_eq!(rows.len(), report.wards.len());
    assert_eq!(rows[0].ward_id, "0101");
    assert_eq!(rows[0].temp_mean, Some(27.0));

    let csv = to_csv(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + report.wards.len());
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert!(lines[1].starts_with("1.0,01,Mombasa,0101,Ward 0101,"));
}

#[test]
fn test_csv_without_wards_is_header_only() {
    let mut report = Fixture::new(east_wetter).report();
    report.wards.clear();
    report.extremes = Default::default();

    assert!(csv_rows(&report).is_empty());
    let csv = to_csv(&report).unwrap();
    assert_eq!(csv.lines().count(), 1);
    assert_eq!(csv.trim_end(), CSV_HEADER.join(","));
}

#[test]
fn test_report_json_without_wards_key_parses() {
    let mut report = Fixture::new(east_wetter).report();
    report.wards.clear();
    report.extremes = Default::default();
    let mut value: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
    value.as_object_mut().unwrap().remove("wards");

    let parsed: CountyWeatherReport = serde_json::from_value(value).unwrap();
    assert!(parsed.wards.is_empty());
    assert!(csv_rows(&parsed).is_empty());
    assert_eq!(to_csv(&parsed).unwrap().trim_end(), CSV_HEADER.join(","));
}

#[test]
fn test_invalid_county_id_fails_validation() {
    let fixture = Fixture::new(east_wetter);
    let mut summary = fixture.summary.clone();
    summary.county_id = "999".to_string();
    let input = AssemblyInput {
        summary: &summary,
        ..fixture.input()
    };

    match ReportAssembler::default().assemble(input) {
        Err(ReportError::Validation(e)) => {
            assert!(e.violations.iter().any(|v| v.contains("\"999\"")));
        }
        other => panic!("expected validation error, got {:?}", other.map(|r| r.county_id)),
    }

    let mut report = fixture.report();
    report.county_id = "48".to_string();
    let e = validate(&report).unwrap_err();
    assert!(e.violations[0].contains("not a KNBS county code"));
    assert!(matches!(to_csv(&report), Err(ReportError::Validation(_))));
}

#[test]
fn test_validation_lists_every_violation() {
    let mut report = Fixture::new(east_wetter).report();
    report.schema_version = "2.0".to_string();
    report.county_name = " ".to_string();
    report.disclaimer.clear();
    report.period.end = report.period.start;
    report.period.year = 1999;
    report.variables.temperature.daily.pop();
    report.wards[1].ward_id = report.wards[0].ward_id.clone();
    report.wards[2].grid_points_used = 0;
    report.wards[3].daily_rainfall[0] = Some(-5.0);

    let e = validate(&report).unwrap_err();
    let all = e.violations.join("\n");
    for expected in [
        "schema_version",
        "county_name",
        "disclaimer",
        "period end",
        "year 1999",
        "variables.temperature.daily has 6 entries",
        "appears more than once",
        "disagrees with quality_flag",
        "daily_rainfall value -5",
    ] {
        assert!(all.contains(expected), "missing {:?} in\n{}", expected, all);
    }
    assert!(e.to_string().contains("violation(s)"));
}

#[test]
fn test_week_number_must_match_start_date() {
    let mut report = Fixture::new(east_wetter).report();
    report.period.week_number = 8;
    let e = validate(&report).unwrap_err();
    assert_eq!(e.violations.len(), 1);
    assert!(e.violations[0].contains("not the ISO week of start 2026-02-09"));

    // 2027-01-01 falls in ISO week 53 of 2026
    let mut report = Fixture::new(east_wetter).report();
    let start = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
    report.period.start = start;
    report.period.end = start + Duration::days(6);
    report.period.week_number = 53;
    report.period.year = 2026;
    validate(&report).unwrap();
    report.period.year = 2027;
    assert!(validate(&report).is_err());
}

#[test]
fn test_extreme_ward_must_be_listed() {
    let mut report = Fixture::new(east_wetter).report();
    if let Some(hottest) = report.extremes.hottest_ward.as_mut() {
        hottest.ward_id = "0199".to_string();
    }
    let e = validate(&report).unwrap_err();
    assert_eq!(
        e.violations,
        vec!["extremes.hottest_ward: ward_id \"0199\" is not among wards".to_string()]
    );

    report.extremes.hottest_ward = None;
    validate(&report).unwrap();
}

#[test]
fn test_implausible_rainfall_blocks_assembly() {
    let fixture = Fixture::new(|_, _| 400.0);
    let result = ReportAssembler::default().assemble(fixture.input());
    match result {
        Err(ReportError::Validation(e)) => {
            assert!(e.violations.iter().any(|v| v.contains("rainfall_total")));
        }
        other => panic!("expected validation error, got {:?}", other.is_ok()),
    }
}

#[test]
fn test_pdf_output() {
    let report = Fixture::new(east_wetter).report();
    let pdf = ReportAssembler::default().to_pdf(&report).unwrap();

    assert!(pdf.starts_with(b"%PDF-1.4"));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.trim_end().ends_with("%%EOF"));
    assert!(text.contains("/BaseFont /Helvetica"));
    assert!(text.matches("/Type /Page ").count() >= 4);
}

#[test]
fn test_pdf_with_map_images_and_many_wards() {
    let mut report = Fixture::new(east_wetter).report();
    let template = report.wards[0].clone();
    for n in 0..80 {
        let mut ward = template.clone();
        ward.ward_id = format!("01{:02}", 10 + n);
        ward.ward_name = format!("Extra Ward {}", n);
        report.wards.push(ward);
    }

    let mut config = ReportConfig::default();
    config
        .map_images
        .insert("rainfall".to_string(), "maps/01-rainfall.png".into());
    let pdf = report::render_pdf(&report, &config).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    // the ward table spills onto extra pages
    assert!(text.matches("/Type /Page ").count() >= 5);
}

#[test]
fn test_pdf_refuses_invalid_report() {
    let mut report = Fixture::new(east_wetter).report();
    report.disclaimer.clear();
    assert!(matches!(
        report::render_pdf(&report, &ReportConfig::default()),
        Err(ReportError::Validation(_))
    ));
}
