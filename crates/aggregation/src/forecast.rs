//! Ward forecasts and the weekly aggregation rules.

use std::fmt;

use forecast_common::DAYS_PER_PERIOD;
use serde::{Deserialize, Serialize};

/// Report variable of a ward forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WardVariable {
    Temperature,
    Rainfall,
    Wind,
}

impl WardVariable {
    pub const ALL: [WardVariable; 3] = [
        WardVariable::Temperature,
        WardVariable::Rainfall,
        WardVariable::Wind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WardVariable::Temperature => "temperature",
            WardVariable::Rainfall => "rainfall",
            WardVariable::Wind => "wind",
        }
    }
}

impl fmt::Display for WardVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data quality of one ward forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Good,
    Degraded,
    Missing,
}

impl QualityFlag {
    /// `missing` iff no point contributed; `degraded` when below the density
    /// threshold or any day has no value.
    pub fn classify(grid_points_used: usize, min_grid_points: usize, daily: &[Option<f64>]) -> Self {
        if grid_points_used == 0 {
            QualityFlag::Missing
        } else if grid_points_used < min_grid_points || daily.iter().any(Option::is_none) {
            QualityFlag::Degraded
        } else {
            QualityFlag::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityFlag::Good => "good",
            QualityFlag::Degraded => "degraded",
            QualityFlag::Missing => "missing",
        }
    }
}

/// Weekly statistics over seven daily values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Rainfall only: sum of the daily values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Rainfall only: wettest daily value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_intensity: Option<f64>,
    /// Rainfall only: days at or above the rainy day threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainy_days: Option<u32>,
    /// Wind only: strongest gust of the week
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gust: Option<f64>,
    /// Wind only: daily gust maxima
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_peak: Option<Vec<Option<f64>>>,
    /// Wind only: weekly mean eastward component (km/h)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_u: Option<f64>,
    /// Wind only: weekly mean northward component (km/h)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_v: Option<f64>,
    /// Index of the day with the largest value, earliest on ties
    pub peak_day: Option<usize>,
}

/// Daily inputs for one ward (or county) and variable.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub values: Vec<Option<f64>>,
    /// Wind only: daily gust maxima
    pub gusts: Option<Vec<Option<f64>>>,
    pub wind_u: Option<Vec<Option<f64>>>,
    pub wind_v: Option<Vec<Option<f64>>>,
}

impl DailySeries {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }
}

/// Apply the weekly rules for `variable` to a daily series.
pub fn weekly_aggregate(
    variable: WardVariable,
    series: &DailySeries,
    rainy_day_threshold_mm: f64,
) -> WeeklyAggregate {
    let daily = &series.values;
    let present: Vec<f64> = daily.iter().flatten().copied().collect();

    let mut weekly = WeeklyAggregate {
        mean: mean(&present),
        min: present.iter().copied().reduce(f64::min),
        max: present.iter().copied().reduce(f64::max),
        peak_day: peak_day(daily),
        ..Default::default()
    };

    match variable {
        WardVariable::Temperature => {}
        WardVariable::Rainfall => {
            if !present.is_empty() {
                weekly.total = Some(present.iter().sum());
                weekly.max_intensity = weekly.max;
                weekly.rainy_days =
                    Some(present.iter().filter(|v| **v >= rainy_day_threshold_mm).count() as u32);
            }
        }
        WardVariable::Wind => {
            let gusts = series.gusts.clone().unwrap_or_else(|| vec![None; daily.len()]);
            let peak_gust = gusts.iter().flatten().copied().reduce(f64::max);
            // a gust is never weaker than the mean wind it sits on
            weekly.max_gust = match (peak_gust, weekly.max) {
                (Some(g), Some(s)) => Some(g.max(s)),
                (g, s) => g.or(s),
            };
            weekly.daily_peak = Some(gusts);
            weekly.mean_u = series.wind_u.as_deref().and_then(mean_of_present);
            weekly.mean_v = series.wind_v.as_deref().and_then(mean_of_present);
        }
    }

    weekly
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&present)
}

/// Index of the maximum value; the earliest index wins ties.
pub fn peak_day(daily: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in daily.iter().enumerate() {
        if let Some(v) = value {
            if best.map_or(true, |(_, b)| *v > b) {
                best = Some((index, *v));
            }
        }
    }
    best.map(|(index, _)| index)
}

/// One variable of one ward over the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardForecast {
    pub ward_id: String,
    pub ward_name: String,
    pub variable: WardVariable,
    /// One value per forecast day; mean wind speed for wind
    pub daily: Vec<Option<f64>>,
    pub weekly: WeeklyAggregate,
    pub grid_points_used: usize,
    pub quality_flag: QualityFlag,
}

impl WardForecast {
    /// A ward with no contributing points: all values null.
    pub fn missing(ward_id: &str, ward_name: &str, variable: WardVariable) -> Self {
        Self {
            ward_id: ward_id.to_string(),
            ward_name: ward_name.to_string(),
            variable,
            daily: vec![None; DAYS_PER_PERIOD],
            weekly: WeeklyAggregate::default(),
            grid_points_used: 0,
            quality_flag: QualityFlag::Missing,
        }
    }
}

/// The three forecasts of one ward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardWeather {
    pub ward_id: String,
    pub ward_name: String,
    pub temperature: WardForecast,
    pub rainfall: WardForecast,
    pub wind: WardForecast,
}

impl WardWeather {
    pub fn forecast(&self, variable: WardVariable) -> &WardForecast {
        match variable {
            WardVariable::Temperature => &self.temperature,
            WardVariable::Rainfall => &self.rainfall,
            WardVariable::Wind => &self.wind,
        }
    }

    /// Worst flag across the variables.
    pub fn quality_flag(&self) -> QualityFlag {
        WardVariable::ALL
            .iter()
            .map(|v| self.forecast(*v).quality_flag)
            .max()
            .unwrap_or(QualityFlag::Missing)
    }

    /// Fewest contributing points across the variables.
    pub fn grid_points_used(&self) -> usize {
        WardVariable::ALL
            .iter()
            .map(|v| self.forecast(*v).grid_points_used)
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_classification() {
        let full = vec![Some(1.0); 7];
        let gap = vec![Some(1.0), None, Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(QualityFlag::classify(0, 2, &full), QualityFlag::Missing);
        assert_eq!(QualityFlag::classify(1, 2, &full), QualityFlag::Degraded);
        assert_eq!(QualityFlag::classify(4, 2, &gap), QualityFlag::Degraded);
        assert_eq!(QualityFlag::classify(4, 2, &full), QualityFlag::Good);
    }

    #[test]
    fn test_peak_day_earliest_on_ties() {
        let daily = vec![Some(1.0), Some(3.0), None, Some(3.0), Some(2.0)];
        assert_eq!(peak_day(&daily), Some(1));
        assert_eq!(peak_day(&[None, None]), None);
    }

    #[test]
    fn test_rainfall_weekly() {
        let series = DailySeries::new(vec![
            Some(0.0),
            Some(12.0),
            Some(0.5),
            Some(1.0),
            Some(3.5),
            Some(0.0),
            Some(12.0),
        ]);
        let weekly = weekly_aggregate(WardVariable::Rainfall, &series, 1.0);
        assert_eq!(weekly.total, Some(29.0));
        assert_eq!(weekly.max_intensity, Some(12.0));
        assert_eq!(weekly.rainy_days, Some(4));
        assert_eq!(weekly.peak_day, Some(1));
        assert!(weekly.max_gust.is_none());
    }

    #[test]
    fn test_wind_gust_never_below_speed() {
        let mut series = DailySeries::new(vec![Some(20.0); 7]);
        series.gusts = Some(vec![Some(15.0); 7]);
        let weekly = weekly_aggregate(WardVariable::Wind, &series, 1.0);
        assert_eq!(weekly.max_gust, Some(20.0));
        assert!(weekly.max_gust >= weekly.mean);

        // gusts absent entirely
        let weekly = weekly_aggregate(WardVariable::Wind, &DailySeries::new(vec![Some(9.0); 7]), 1.0);
        assert_eq!(weekly.max_gust, Some(9.0));
    }

    #[test]
    fn test_temperature_weekly_over_daily_means() {
        let series = DailySeries::new(vec![
            Some(20.0),
            Some(22.0),
            Some(24.0),
            Some(26.0),
            Some(24.0),
            Some(22.0),
            Some(16.0),
        ]);
        let weekly = weekly_aggregate(WardVariable::Temperature, &series, 1.0);
        assert_eq!(weekly.mean, Some(22.0));
        assert_eq!(weekly.min, Some(16.0));
        assert_eq!(weekly.max, Some(26.0));
        assert_eq!(weekly.peak_day, Some(3));
        assert!(weekly.total.is_none());
    }
}
