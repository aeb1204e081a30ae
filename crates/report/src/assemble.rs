//! County summary to report document.

use aggregation::{AggregationMethod, CountySummary, WardWeather};
use chrono::{DateTime, Utc};
use forecast_common::ReportPeriod;
use grid_source::ForecastMetadata;
use tracing::{info, instrument, warn};

use crate::config::ReportConfig;
use crate::error::Result;
use crate::narrative;
use crate::schema::{
    CountyWeatherReport, DailyValue, Narrative, PeriodInfo, RainfallOutlook, ReportMetadata,
    TemperatureOutlook, Variables, WardSummary, WindOutlook, SCHEMA_VERSION,
};
use crate::validate::validate;

/// Everything a report is built from.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub summary: &'a CountySummary,
    /// Ward forecasts ordered by ward id
    pub wards: &'a [WardWeather],
    pub period: ReportPeriod,
    pub metadata: &'a ForecastMetadata,
    pub method: AggregationMethod,
}

#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    config: ReportConfig,
}

impl ReportAssembler {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build and validate a report stamped with the current time.
    pub fn assemble(&self, input: AssemblyInput<'_>) -> Result<CountyWeatherReport> {
        self.assemble_at(input, Utc::now())
    }

    /// Build and validate a report stamped with `generated_at`.
    #[instrument(skip_all, fields(county_id = %input.summary.county_id, period = %input.period.key()))]
    pub fn assemble_at(
        &self,
        input: AssemblyInput<'_>,
        generated_at: DateTime<Utc>,
    ) -> Result<CountyWeatherReport> {
        let summary = input.summary;
        let period = input.period;

        let mut wind_weekly = summary.wind.weekly.clone();
        let daily_peak = wind_weekly.daily_peak.take().unwrap_or_default();

        let variables = Variables {
            temperature: TemperatureOutlook {
                units: "°C".to_string(),
                weekly: summary.temperature.weekly.clone(),
                daily: daily_values(&period, &summary.temperature.daily),
            },
            rainfall: RainfallOutlook {
                units: "mm".to_string(),
                weekly: summary.rainfall.weekly.clone(),
                daily: daily_values(&period, &summary.rainfall.daily),
                top_wards: summary.top_rainfall_wards.clone(),
                flood_risk_wards: summary.flood_risk_wards.clone(),
            },
            wind: WindOutlook {
                units: "km/h".to_string(),
                weekly: wind_weekly,
                daily: daily_values(&period, &summary.wind.daily),
                daily_peak: daily_values(&period, &daily_peak),
                dominant_direction: summary.dominant_direction.clone(),
                windiest_wards: summary.windiest_wards.clone(),
            },
        };

        let wards = input
            .wards
            .iter()
            .map(|ward| ward_summary(&period, ward))
            .collect();

        let mut report = CountyWeatherReport {
            schema_version: SCHEMA_VERSION.to_string(),
            county_id: summary.county_id.clone(),
            county_name: summary.county_name.clone(),
            title: format!("Weekly Weather Outlook for {} County", summary.county_name),
            period: PeriodInfo {
                start: period.start,
                end: period.end,
                week_number: period.week_number,
                year: period.year,
                formatted: period.formatted(),
            },
            variables,
            wards,
            extremes: summary.extremes.clone(),
            narrative: Narrative::default(),
            metadata: ReportMetadata {
                model_run_id: input.metadata.model_run_id.clone(),
                generated_at,
                grid_resolution: input.metadata.grid_resolution,
                grid_points_total: input.metadata.grid_points_total,
                data_source: self.config.data_source.clone(),
                aggregation_method: input.method.as_str().to_string(),
                system_version: self.config.system_version.clone(),
            },
            disclaimer: self.config.disclaimer.clone(),
            quality_flags: summary.advisories.clone(),
        };
        report.narrative = narrative::compose(&report);

        if let Err(e) = validate(&report) {
            warn!(violations = e.violations.len(), "Report failed validation");
            return Err(e.into());
        }

        info!(wards = report.wards.len(), "Assembled report");
        Ok(report)
    }
}

fn daily_values(period: &ReportPeriod, values: &[Option<f64>]) -> Vec<DailyValue> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| DailyValue {
            date: period.date(index),
            day: period.day_name(index).to_string(),
            value: *value,
        })
        .collect()
}

fn ward_summary(period: &ReportPeriod, ward: &WardWeather) -> WardSummary {
    let rainfall = &ward.rainfall.weekly;
    let temperature = &ward.temperature.weekly;
    let wind = &ward.wind.weekly;

    WardSummary {
        ward_id: ward.ward_id.clone(),
        ward_name: ward.ward_name.clone(),
        rainfall_total: rainfall.total,
        rainy_days: rainfall.rainy_days,
        peak_rainfall_day: rainfall.peak_day.map(|d| period.day_name(d).to_string()),
        temp_mean: temperature.mean,
        temp_max: temperature.max,
        temp_min: temperature.min,
        wind_mean: wind.mean,
        wind_max: wind.max_gust,
        daily_rainfall: ward.rainfall.daily.clone(),
        daily_temperature: ward.temperature.daily.clone(),
        daily_wind: ward.wind.daily.clone(),
        grid_points_used: ward.grid_points_used(),
        quality_flag: ward.quality_flag(),
    }
}
