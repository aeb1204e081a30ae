//! PDF rendering of a county report.
//!
//! Fixed section order: cover, executive summary, narrative, daily and ward
//! tables, maps, disclaimer.

mod layout;
mod writer;

pub use writer::{Font, Page, PdfDocument};

use aggregation::QualityFlag;
use tracing::{debug, instrument};

use crate::config::ReportConfig;
use crate::error::Result;
use crate::schema::CountyWeatherReport;
use crate::validate::validate;
use layout::{Column, Layout};

const MAP_VARIABLES: [(&str, &str); 3] = [
    ("rainfall", "Rainfall"),
    ("temperature", "Temperature"),
    ("wind", "Wind"),
];

/// Largest number of wards drawn in the rainfall chart.
const CHART_WARDS: usize = 25;

/// Validate and render `report`.
#[instrument(skip_all, fields(county_id = %report.county_id))]
pub fn render_pdf(report: &CountyWeatherReport, config: &ReportConfig) -> Result<Vec<u8>> {
    validate(report)?;

    let mut layout = Layout::new(&report.title);
    cover(&mut layout, report);

    layout.new_page();
    executive_summary(&mut layout, report);
    outlook(&mut layout, report);

    layout.new_page();
    daily_table(&mut layout, report);
    ward_table(&mut layout, report);

    layout.new_page();
    maps(&mut layout, report, config);

    layout.heading("Disclaimer");
    layout.paragraph(&report.disclaimer);

    let bytes = layout.finish()?;
    debug!(bytes = bytes.len(), "Rendered PDF");
    Ok(bytes)
}

fn cover(layout: &mut Layout, report: &CountyWeatherReport) {
    let meta = &report.metadata;
    layout.move_to(640.0);
    layout.centered(Font::Bold, 22.0, &report.title);
    layout.space(16.0);
    layout.centered(Font::Bold, 18.0, &format!("{} County", report.county_name));
    layout.space(8.0);
    layout.centered(Font::Regular, 12.0, &report.period.formatted);

    layout.move_to(360.0);
    layout.field("Data Source:", &meta.data_source);
    layout.field("Model Run:", &meta.model_run_id);
    layout.field(
        "Generated:",
        &meta.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    layout.field("Aggregation:", &meta.aggregation_method.replace('_', " "));
    layout.field("System Version:", &meta.system_version);

    layout.move_to(200.0);
    layout.paragraph_sized(&report.disclaimer, 8.0);
}

fn executive_summary(layout: &mut Layout, report: &CountyWeatherReport) {
    let vars = &report.variables;
    layout.heading("Executive Summary");
    layout.subheading("Weekly Statistics");

    let rain = &vars.rainfall.weekly;
    layout.field(
        "Total rainfall:",
        &match rain.total {
            Some(total) => format!(
                "{:.1} mm ({} rainy days)",
                total,
                rain.rainy_days.unwrap_or(0)
            ),
            None => "-".to_string(),
        },
    );
    let temperature = &vars.temperature.weekly;
    layout.field(
        "Mean temperature:",
        &match (temperature.mean, temperature.min, temperature.max) {
            (Some(mean), Some(min), Some(max)) => {
                format!("{:.1}°C (daily {:.1} to {:.1}°C)", mean, min, max)
            }
            _ => "-".to_string(),
        },
    );
    layout.field("Mean wind speed:", &with_units(vars.wind.weekly.mean, "km/h"));
    layout.field("Maximum gust:", &with_units(vars.wind.weekly.max_gust, "km/h"));
    layout.field(
        "Dominant wind from:",
        vars.wind.dominant_direction.as_deref().unwrap_or("-"),
    );

    let count = |flag: QualityFlag| report.wards.iter().filter(|w| w.quality_flag == flag).count();
    layout.field(
        "Wards:",
        &format!(
            "{} ({} good, {} degraded, {} missing)",
            report.wards.len(),
            count(QualityFlag::Good),
            count(QualityFlag::Degraded),
            count(QualityFlag::Missing)
        ),
    );

    if !report.narrative.highlights.is_empty() {
        layout.subheading("Key Highlights");
        for highlight in &report.narrative.highlights {
            layout.bullet(highlight);
        }
    }

    if !report.quality_flags.is_empty() {
        layout.subheading("Data Quality Advisories");
        for advisory in &report.quality_flags {
            layout.bullet(advisory);
        }
    }
}

fn outlook(layout: &mut Layout, report: &CountyWeatherReport) {
    let narrative = &report.narrative;
    layout.heading("Weather Outlook");
    layout.paragraph(&narrative.summary);
    layout.paragraph(&narrative.early_week);
    layout.paragraph(&narrative.mid_week);
    layout.paragraph(&narrative.late_week);
}

fn daily_table(layout: &mut Layout, report: &CountyWeatherReport) {
    let vars = &report.variables;
    layout.heading("Daily Forecast");

    let columns = [
        Column { title: "Day", width: 90.0 },
        Column { title: "Date", width: 80.0 },
        Column { title: "Rainfall (mm)", width: 85.0 },
        Column { title: "Temp (°C)", width: 80.0 },
        Column { title: "Wind (km/h)", width: 80.0 },
        Column { title: "Gust (km/h)", width: 80.0 },
    ];
    let rows: Vec<Vec<String>> = vars
        .rainfall
        .daily
        .iter()
        .enumerate()
        .map(|(i, day)| {
            vec![
                day.day.clone(),
                day.date.format("%Y-%m-%d").to_string(),
                number(day.value),
                number(vars.temperature.daily.get(i).and_then(|d| d.value)),
                number(vars.wind.daily.get(i).and_then(|d| d.value)),
                number(vars.wind.daily_peak.get(i).and_then(|d| d.value)),
            ]
        })
        .collect();
    layout.table(&columns, &rows);
}

fn ward_table(layout: &mut Layout, report: &CountyWeatherReport) {
    layout.heading("Ward Summary");
    if report.wards.is_empty() {
        layout.paragraph("No wards are available for this county.");
        return;
    }

    let columns = [
        Column { title: "Ward", width: 135.0 },
        Column { title: "Rain (mm)", width: 60.0 },
        Column { title: "Rainy days", width: 60.0 },
        Column { title: "Temp (°C)", width: 60.0 },
        Column { title: "Range (°C)", width: 75.0 },
        Column { title: "Gust (km/h)", width: 65.0 },
        Column { title: "Quality", width: 40.0 },
    ];
    let rows: Vec<Vec<String>> = report
        .wards
        .iter()
        .map(|ward| {
            vec![
                ward.ward_name.clone(),
                number(ward.rainfall_total),
                ward.rainy_days.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                number(ward.temp_mean),
                match (ward.temp_min, ward.temp_max) {
                    (Some(min), Some(max)) => format!("{:.1} - {:.1}", min, max),
                    _ => "-".to_string(),
                },
                number(ward.wind_max),
                ward.quality_flag.as_str().to_string(),
            ]
        })
        .collect();
    layout.table(&columns, &rows);
}

fn maps(layout: &mut Layout, report: &CountyWeatherReport, config: &ReportConfig) {
    layout.heading("Maps");
    for (key, label) in MAP_VARIABLES {
        layout.subheading(&format!("{} map", label));
        match config.map_images.get(key) {
            Some(path) => layout.paragraph(&format!("Map image: {}", path.display())),
            None => {
                layout.paragraph(&format!("No {} map is available for this report.", key));
                if key == "rainfall" {
                    rainfall_chart(layout, report);
                }
            }
        }
    }
}

fn rainfall_chart(layout: &mut Layout, report: &CountyWeatherReport) {
    let bars: Vec<(String, f64)> = report
        .wards
        .iter()
        .filter_map(|w| w.rainfall_total.map(|t| (w.ward_name.clone(), t)))
        .take(CHART_WARDS)
        .collect();
    if bars.is_empty() {
        return;
    }
    layout.paragraph("Weekly rainfall total by ward:");
    layout.bar_chart(&bars, "mm");
}

fn number(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn with_units(value: Option<f64>, units: &str) -> String {
    value
        .map(|v| format!("{:.1} {}", v, units))
        .unwrap_or_else(|| "-".to_string())
}
