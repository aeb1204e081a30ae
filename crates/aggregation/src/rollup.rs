//! County summaries from ward forecasts.
//!
//! The rollup never invents values: county series average only the wards
//! that have a value on a given day.

use std::cmp::Ordering;

use forecast_common::{compare_ids, DAYS_PER_PERIOD};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aggregator::CountyAggregation;
use crate::config::AggregationConfig;
use crate::forecast::{
    weekly_aggregate, DailySeries, QualityFlag, WardVariable, WardWeather, WeeklyAggregate,
};

/// Plausible county-wide weekly rainfall total (mm).
pub const RAINFALL_TOTAL_BAND: (f64, f64) = (0.0, 500.0);
/// Plausible county-wide weekly mean temperature (deg C).
pub const MEAN_TEMPERATURE_BAND: (f64, f64) = (-10.0, 50.0);
/// Plausible county-wide maximum gust (km/h).
pub const MAX_GUST_BAND: (f64, f64) = (0.0, 200.0);

const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// A ward and the value that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardValue {
    pub ward_id: String,
    pub ward_name: String,
    pub value: f64,
}

/// The wards at the extremes of the week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub highest_rainfall: Option<WardValue>,
    pub hottest_ward: Option<WardValue>,
    pub coolest_ward: Option<WardValue>,
    pub strongest_wind: Option<WardValue>,
}

/// County series of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountySeries {
    pub daily: Vec<Option<f64>>,
    pub weekly: WeeklyAggregate,
}

/// Ward counts by quality flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCounts {
    pub good: usize,
    pub degraded: usize,
    pub missing: usize,
}

impl QualityCounts {
    pub fn total(&self) -> usize {
        self.good + self.degraded + self.missing
    }
}

/// Everything the report needs about one county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountySummary {
    pub county_id: String,
    pub county_name: String,
    pub temperature: CountySeries,
    pub rainfall: CountySeries,
    pub wind: CountySeries,
    pub extremes: Extremes,
    /// Wards by weekly rainfall total, wettest first
    pub top_rainfall_wards: Vec<WardValue>,
    /// Wettest wards whose total exceeds the flood risk threshold
    pub flood_risk_wards: Vec<WardValue>,
    /// Wards by max gust, strongest first
    pub windiest_wards: Vec<WardValue>,
    /// 8-point compass direction the mean wind blows from
    pub dominant_direction: Option<String>,
    pub quality: QualityCounts,
    pub advisories: Vec<String>,
}

/// Roll ward forecasts up into a county summary.
#[instrument(skip_all, fields(county_id = %aggregation.county_id, wards = aggregation.wards.len()))]
pub fn rollup(aggregation: &CountyAggregation, config: &AggregationConfig) -> CountySummary {
    let wards = &aggregation.wards;

    let temperature = county_series(wards, WardVariable::Temperature, config);
    let rainfall = county_series(wards, WardVariable::Rainfall, config);
    let wind = county_series(wards, WardVariable::Wind, config);

    let extremes = Extremes {
        highest_rainfall: select(wards, |w| w.rainfall.weekly.total, Ordering::Greater),
        hottest_ward: select(wards, |w| w.temperature.weekly.mean, Ordering::Greater),
        coolest_ward: select(wards, |w| w.temperature.weekly.mean, Ordering::Less),
        strongest_wind: select(wards, |w| w.wind.weekly.max_gust, Ordering::Greater),
    };

    let top_rainfall_wards = ranking(wards, |w| w.rainfall.weekly.total, config.top_rainfall_wards);
    let flood_risk_wards: Vec<WardValue> =
        ranking(wards, |w| w.rainfall.weekly.total, usize::MAX)
            .into_iter()
            .filter(|w| w.value > config.flood_risk_threshold_mm)
            .take(config.flood_risk_wards)
            .collect();
    let windiest_wards = ranking(wards, |w| w.wind.weekly.max_gust, config.windiest_wards);

    let dominant_direction = match (wind.weekly.mean_u, wind.weekly.mean_v) {
        (Some(u), Some(v)) => compass_direction(u, v).map(str::to_string),
        _ => None,
    };

    let mut quality = QualityCounts::default();
    for ward in wards {
        match ward.quality_flag() {
            QualityFlag::Good => quality.good += 1,
            QualityFlag::Degraded => quality.degraded += 1,
            QualityFlag::Missing => quality.missing += 1,
        }
    }

    let advisories = advisories(&quality, &temperature, &rainfall, &wind, config);
    for advisory in &advisories {
        warn!(county_id = %aggregation.county_id, advisory = %advisory, "County advisory");
    }
    debug!(?quality, "Rolled up county");

    CountySummary {
        county_id: aggregation.county_id.clone(),
        county_name: aggregation.county_name.clone(),
        temperature,
        rainfall,
        wind,
        extremes,
        top_rainfall_wards,
        flood_risk_wards,
        windiest_wards,
        dominant_direction,
        quality,
        advisories,
    }
}

fn county_series(wards: &[WardWeather], variable: WardVariable, config: &AggregationConfig) -> CountySeries {
    let values = daily_mean(wards, |w| &w.forecast(variable).daily);

    let series = match variable {
        WardVariable::Wind => DailySeries {
            values,
            gusts: Some(daily_max(wards, |w| w.wind.weekly.daily_peak.as_deref())),
            wind_u: ward_mean(wards, |w| w.wind.weekly.mean_u).map(|u| vec![Some(u)]),
            wind_v: ward_mean(wards, |w| w.wind.weekly.mean_v).map(|v| vec![Some(v)]),
        },
        _ => DailySeries::new(values),
    };

    let weekly = weekly_aggregate(variable, &series, config.rainy_day_threshold_mm);
    CountySeries {
        daily: series.values,
        weekly,
    }
}

/// Per day, the mean over wards with a value.
fn daily_mean<'a>(wards: &'a [WardWeather], daily: impl Fn(&'a WardWeather) -> &'a Vec<Option<f64>>) -> Vec<Option<f64>> {
    (0..DAYS_PER_PERIOD)
        .map(|day| {
            let values: Vec<f64> = wards
                .iter()
                .filter_map(|w| daily(w).get(day).copied().flatten())
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        })
        .collect()
}

/// Per day, the maximum over wards with a value.
fn daily_max<'a>(
    wards: &'a [WardWeather],
    daily: impl Fn(&'a WardWeather) -> Option<&'a [Option<f64>]>,
) -> Vec<Option<f64>> {
    (0..DAYS_PER_PERIOD)
        .map(|day| {
            wards
                .iter()
                .filter_map(|w| daily(w).and_then(|d| d.get(day).copied().flatten()))
                .reduce(f64::max)
        })
        .collect()
}

fn ward_mean(wards: &[WardWeather], value: impl Fn(&WardWeather) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = wards.iter().filter_map(value).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Ward with the largest (`Greater`) or smallest (`Less`) value; ties go to
/// the lowest ward id.
fn select(
    wards: &[WardWeather],
    value: impl Fn(&WardWeather) -> Option<f64>,
    want: Ordering,
) -> Option<WardValue> {
    let mut best: Option<(&WardWeather, f64)> = None;
    for ward in wards {
        let Some(v) = value(ward) else { continue };
        let better = match best {
            None => true,
            Some((current, b)) => match v.partial_cmp(&b) {
                Some(Ordering::Equal) => compare_ids(&ward.ward_id, &current.ward_id) == Ordering::Less,
                Some(order) => order == want,
                None => false,
            },
        };
        if better {
            best = Some((ward, v));
        }
    }
    best.map(|(ward, value)| WardValue {
        ward_id: ward.ward_id.clone(),
        ward_name: ward.ward_name.clone(),
        value,
    })
}

/// Up to `limit` wards by descending value, lowest ward id first on ties.
fn ranking(
    wards: &[WardWeather],
    value: impl Fn(&WardWeather) -> Option<f64>,
    limit: usize,
) -> Vec<WardValue> {
    let mut ranked: Vec<WardValue> = wards
        .iter()
        .filter_map(|w| {
            value(w).map(|v| WardValue {
                ward_id: w.ward_id.clone(),
                ward_name: w.ward_name.clone(),
                value: v,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| compare_ids(&a.ward_id, &b.ward_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Compass point the wind blows from, for a mean vector (u east, v north).
pub fn compass_direction(u: f64, v: f64) -> Option<&'static str> {
    if u.hypot(v) < 1e-6 {
        return None;
    }
    let degrees = (-u).atan2(-v).to_degrees().rem_euclid(360.0);
    let sector = ((degrees + 22.5) / 45.0) as usize % COMPASS_POINTS.len();
    Some(COMPASS_POINTS[sector])
}

fn advisories(
    quality: &QualityCounts,
    temperature: &CountySeries,
    rainfall: &CountySeries,
    wind: &CountySeries,
    config: &AggregationConfig,
) -> Vec<String> {
    let mut advisories = Vec::new();
    let total = quality.total();

    let not_good = quality.degraded + quality.missing;
    if total > 0 && not_good as f64 / total as f64 > config.degraded_fraction_threshold {
        advisories.push(format!(
            "Reduced data quality: {} of {} wards have degraded or missing data",
            not_good, total
        ));
    }
    if quality.missing > 0 {
        advisories.push(format!(
            "Partial missing data: {} of {} wards received no grid points",
            quality.missing, total
        ));
    }

    let checks = [
        ("Weekly rainfall total", "mm", rainfall.weekly.total, RAINFALL_TOTAL_BAND),
        ("Weekly mean temperature", "°C", temperature.weekly.mean, MEAN_TEMPERATURE_BAND),
        ("Maximum gust", "km/h", wind.weekly.max_gust, MAX_GUST_BAND),
    ];
    for (label, units, value, (low, high)) in checks {
        if let Some(v) = value {
            if v < low || v > high {
                advisories.push(format!(
                    "{} of {:.1} {} is outside the plausible range {}..{} {}",
                    label, v, units, low, high, units
                ));
            }
        }
    }

    advisories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compass_direction() {
        // wind blowing toward the north comes from the south
        assert_eq!(compass_direction(0.0, 10.0), Some("S"));
        assert_eq!(compass_direction(-10.0, 0.0), Some("E"));
        assert_eq!(compass_direction(10.0, 10.0), Some("SW"));
        assert_eq!(compass_direction(0.0, -5.0), Some("N"));
        assert_eq!(compass_direction(0.0, 0.0), None);
    }
}
