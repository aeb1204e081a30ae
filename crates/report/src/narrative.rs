//! Template narrative text.
//!
//! Every sentence is a fixed template filled from report values, so the same
//! report always reads the same way.

use crate::schema::{CountyWeatherReport, DailyValue, Narrative};

/// Day ranges of the three narrative parts.
const EARLY_WEEK: std::ops::Range<usize> = 0..3;
const MID_WEEK: std::ops::Range<usize> = 3..5;
const LATE_WEEK: std::ops::Range<usize> = 5..7;

pub fn compose(report: &CountyWeatherReport) -> Narrative {
    Narrative {
        summary: summary(report),
        early_week: part(report, "Early week", EARLY_WEEK),
        mid_week: part(report, "Mid week", MID_WEEK),
        late_week: part(report, "Late week", LATE_WEEK),
        highlights: highlights(report),
    }
}

fn summary(report: &CountyWeatherReport) -> String {
    let vars = &report.variables;
    let mut sentences = Vec::new();

    match vars.rainfall.weekly.total {
        Some(total) => {
            let rainy = vars.rainfall.weekly.rainy_days.unwrap_or(0);
            sentences.push(format!(
                "{} County can expect {:.1} mm of rainfall over the week, with {} rainy {}.",
                report.county_name,
                total,
                rainy,
                if rainy == 1 { "day" } else { "days" }
            ));
        }
        None => sentences.push(format!(
            "Rainfall data is unavailable for {} County this week.",
            report.county_name
        )),
    }

    let t = &vars.temperature.weekly;
    match (t.mean, t.min, t.max) {
        (Some(mean), Some(min), Some(max)) => sentences.push(format!(
            "Temperatures average {:.1}°C, with daily means between {:.1}°C and {:.1}°C.",
            mean, min, max
        )),
        _ => sentences.push("Temperature data is unavailable.".to_string()),
    }

    let w = &vars.wind.weekly;
    if let (Some(mean), Some(gust)) = (w.mean, w.max_gust) {
        let direction = vars
            .wind
            .dominant_direction
            .as_deref()
            .map(|d| format!(", mostly from the {}", d))
            .unwrap_or_default();
        sentences.push(format!(
            "Winds average {:.1} km/h with gusts up to {:.1} km/h{}.",
            mean, gust, direction
        ));
    }

    sentences.join(" ")
}

fn part(report: &CountyWeatherReport, label: &str, days: std::ops::Range<usize>) -> String {
    let vars = &report.variables;
    let rain = slice(&vars.rainfall.daily, days.clone());
    let temperature = slice(&vars.temperature.daily, days.clone());

    let (Some(first), Some(last)) = (rain.first(), rain.last()) else {
        return format!("{}: no forecast days.", label);
    };
    let span = if first.day == last.day {
        first.day.clone()
    } else {
        format!("{} to {}", first.day, last.day)
    };

    let rain_total = total(rain);
    let rain_text = match rain_total {
        Some(t) if t < 1.0 => "mostly dry conditions".to_string(),
        Some(t) => format!("{:.1} mm of rain in total", t),
        None => "no rainfall data".to_string(),
    };
    let temperature_text = match mean(temperature) {
        Some(t) => format!(", temperatures around {:.1}°C", t),
        None => String::new(),
    };

    format!("{} ({}): {}{}.", label, span, rain_text, temperature_text)
}

fn highlights(report: &CountyWeatherReport) -> Vec<String> {
    let vars = &report.variables;
    let mut highlights = Vec::new();

    if let Some(day) = vars
        .rainfall
        .weekly
        .peak_day
        .and_then(|i| vars.rainfall.daily.get(i))
    {
        if let Some(value) = day.value {
            highlights.push(format!("Wettest day: {} with {:.1} mm", day.day, value));
        }
    }
    if let Some(ward) = &report.extremes.highest_rainfall {
        highlights.push(format!(
            "Highest rainfall: {} ({:.1} mm)",
            ward.ward_name, ward.value
        ));
    }
    if let Some(ward) = &report.extremes.hottest_ward {
        highlights.push(format!("Warmest ward: {} ({:.1}°C)", ward.ward_name, ward.value));
    }
    if let Some(ward) = &report.extremes.coolest_ward {
        highlights.push(format!("Coolest ward: {} ({:.1}°C)", ward.ward_name, ward.value));
    }
    if let Some(ward) = &report.extremes.strongest_wind {
        highlights.push(format!(
            "Strongest gusts: {} ({:.1} km/h)",
            ward.ward_name, ward.value
        ));
    }
    if !vars.rainfall.flood_risk_wards.is_empty() {
        let names: Vec<&str> = vars
            .rainfall
            .flood_risk_wards
            .iter()
            .map(|w| w.ward_name.as_str())
            .collect();
        highlights.push(format!("Flood risk: {}", names.join(", ")));
    }

    highlights
}

fn slice(days: &[DailyValue], range: std::ops::Range<usize>) -> &[DailyValue] {
    let end = range.end.min(days.len());
    let start = range.start.min(end);
    &days[start..end]
}

fn total(days: &[DailyValue]) -> Option<f64> {
    let values: Vec<f64> = days.iter().filter_map(|d| d.value).collect();
    (!values.is_empty()).then(|| values.iter().sum())
}

fn mean(days: &[DailyValue]) -> Option<f64> {
    let values: Vec<f64> = days.iter().filter_map(|d| d.value).collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
