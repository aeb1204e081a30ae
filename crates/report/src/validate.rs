//! Validation gate run before a report is returned or rendered.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use aggregation::{QualityFlag, WardValue};
use boundaries::knbs;
use chrono::{Datelike, Duration};
use forecast_common::DAYS_PER_PERIOD;

use crate::error::SchemaValidationError;
use crate::schema::{CountyWeatherReport, DailyValue, SCHEMA_VERSION};

pub const RAINFALL_RANGE: RangeInclusive<f64> = 0.0..=2000.0;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -30.0..=60.0;
pub const WIND_RANGE: RangeInclusive<f64> = 0.0..=400.0;
pub const YEAR_RANGE: RangeInclusive<i32> = 2000..=2100;
pub const WEEK_RANGE: RangeInclusive<u32> = 1..=53;

/// Check every rule and report all violations at once.
pub fn validate(report: &CountyWeatherReport) -> Result<(), SchemaValidationError> {
    let mut v = Violations::default();

    if report.schema_version != SCHEMA_VERSION {
        v.push(format!(
            "schema_version must be \"{}\", got \"{}\"",
            SCHEMA_VERSION, report.schema_version
        ));
    }

    let id = &report.county_id;
    if id.len() != 2 || !id.bytes().all(|b| b.is_ascii_digit()) {
        v.push(format!("county_id \"{}\" is not a 2-digit code", id));
    } else if !knbs::is_county_code(id) {
        v.push(format!("county_id \"{}\" is not a KNBS county code", id));
    }
    if report.county_name.trim().is_empty() {
        v.push("county_name is empty".to_string());
    }

    let period = &report.period;
    if period.end != period.start + Duration::days(DAYS_PER_PERIOD as i64 - 1) {
        v.push(format!(
            "period end {} is not 6 days after start {}",
            period.end, period.start
        ));
    }
    if !WEEK_RANGE.contains(&period.week_number) {
        v.push(format!("week_number {} is outside 1..=53", period.week_number));
    }
    if !YEAR_RANGE.contains(&period.year) {
        v.push(format!("year {} is outside 2000..=2100", period.year));
    }
    let iso = period.start.iso_week();
    if iso.week() != period.week_number || iso.year() != period.year {
        v.push(format!(
            "week {} of {} is not the ISO week of start {} (week {} of {})",
            period.week_number,
            period.year,
            period.start,
            iso.week(),
            iso.year()
        ));
    }

    let vars = &report.variables;
    v.daily("variables.temperature.daily", &vars.temperature.daily, &TEMPERATURE_RANGE);
    v.daily("variables.rainfall.daily", &vars.rainfall.daily, &RAINFALL_RANGE);
    v.daily("variables.wind.daily", &vars.wind.daily, &WIND_RANGE);
    v.daily("variables.wind.daily_peak", &vars.wind.daily_peak, &WIND_RANGE);

    let weekly_checks = [
        ("variables.temperature.weekly.mean", vars.temperature.weekly.mean, &TEMPERATURE_RANGE),
        ("variables.temperature.weekly.min", vars.temperature.weekly.min, &TEMPERATURE_RANGE),
        ("variables.temperature.weekly.max", vars.temperature.weekly.max, &TEMPERATURE_RANGE),
        ("variables.rainfall.weekly.total", vars.rainfall.weekly.total, &RAINFALL_RANGE),
        ("variables.wind.weekly.mean", vars.wind.weekly.mean, &WIND_RANGE),
        ("variables.wind.weekly.max_gust", vars.wind.weekly.max_gust, &WIND_RANGE),
    ];
    for (field, value, range) in weekly_checks {
        v.range(field, value, range);
    }
    v.ranked("variables.rainfall.top_wards", &vars.rainfall.top_wards, &RAINFALL_RANGE);
    v.ranked("variables.rainfall.flood_risk_wards", &vars.rainfall.flood_risk_wards, &RAINFALL_RANGE);
    v.ranked("variables.wind.windiest_wards", &vars.wind.windiest_wards, &WIND_RANGE);

    let mut seen = HashSet::new();
    for ward in &report.wards {
        let label = format!("wards[{}]", ward.ward_id);
        if ward.ward_id.trim().is_empty() {
            v.push("ward_id is empty".to_string());
        } else if !seen.insert(ward.ward_id.as_str()) {
            v.push(format!("ward_id \"{}\" appears more than once", ward.ward_id));
        }

        let missing = ward.quality_flag == QualityFlag::Missing;
        if (ward.grid_points_used == 0) != missing {
            v.push(format!(
                "{}: grid_points_used {} disagrees with quality_flag {}",
                label,
                ward.grid_points_used,
                ward.quality_flag.as_str()
            ));
        }

        for (name, series, range) in [
            ("daily_rainfall", &ward.daily_rainfall, &RAINFALL_RANGE),
            ("daily_temperature", &ward.daily_temperature, &TEMPERATURE_RANGE),
            ("daily_wind", &ward.daily_wind, &WIND_RANGE),
        ] {
            let field = format!("{}.{}", label, name);
            v.length(&field, series.len());
            for value in series {
                v.range(&field, *value, range);
            }
        }

        v.range(&format!("{}.rainfall_total", label), ward.rainfall_total, &RAINFALL_RANGE);
        v.range(&format!("{}.temp_mean", label), ward.temp_mean, &TEMPERATURE_RANGE);
        v.range(&format!("{}.temp_max", label), ward.temp_max, &TEMPERATURE_RANGE);
        v.range(&format!("{}.temp_min", label), ward.temp_min, &TEMPERATURE_RANGE);
        v.range(&format!("{}.wind_mean", label), ward.wind_mean, &WIND_RANGE);
        v.range(&format!("{}.wind_max", label), ward.wind_max, &WIND_RANGE);
    }

    let extremes = [
        ("extremes.highest_rainfall", &report.extremes.highest_rainfall, &RAINFALL_RANGE),
        ("extremes.hottest_ward", &report.extremes.hottest_ward, &TEMPERATURE_RANGE),
        ("extremes.coolest_ward", &report.extremes.coolest_ward, &TEMPERATURE_RANGE),
        ("extremes.strongest_wind", &report.extremes.strongest_wind, &WIND_RANGE),
    ];
    let ward_ids: HashSet<&str> = report.wards.iter().map(|w| w.ward_id.as_str()).collect();
    for (field, extreme, range) in extremes {
        let Some(extreme) = extreme else { continue };
        v.range(field, Some(extreme.value), range);
        if !ward_ids.contains(extreme.ward_id.as_str()) {
            v.push(format!("{}: ward_id \"{}\" is not among wards", field, extreme.ward_id));
        }
    }

    if report.disclaimer.trim().is_empty() {
        v.push("disclaimer is empty".to_string());
    }

    v.finish()
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, violation: String) {
        self.0.push(violation);
    }

    fn length(&mut self, field: &str, len: usize) {
        if len != DAYS_PER_PERIOD {
            self.push(format!("{} has {} entries, expected {}", field, len, DAYS_PER_PERIOD));
        }
    }

    fn range(&mut self, field: &str, value: Option<f64>, range: &RangeInclusive<f64>) {
        let Some(value) = value else { return };
        if !value.is_finite() || !range.contains(&value) {
            self.push(format!(
                "{} value {} is outside {}..={}",
                field,
                value,
                range.start(),
                range.end()
            ));
        }
    }

    fn daily(&mut self, field: &str, days: &[DailyValue], range: &RangeInclusive<f64>) {
        self.length(field, days.len());
        for day in days {
            self.range(field, day.value, range);
        }
    }

    fn ranked(&mut self, field: &str, wards: &[WardValue], range: &RangeInclusive<f64>) {
        for ward in wards {
            self.range(field, Some(ward.value), range);
        }
    }

    fn finish(self) -> Result<(), SchemaValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError { violations: self.0 })
        }
    }
}
