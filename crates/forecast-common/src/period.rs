//! Weekly reporting periods.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Full weekday names, Monday first.
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Days in a weekly cycle.
pub const DAYS_PER_PERIOD: usize = 7;

/// A seven-day reporting window.
///
/// `week_number` and `year` are the ISO week of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub week_number: u32,
    pub year: i32,
}

impl ReportPeriod {
    /// The Monday-to-Sunday ISO week `week` of `year`.
    pub fn iso_week(year: i32, week: u32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .ok_or(PeriodError::InvalidWeek { year, week })?;
        Ok(Self::starting(start))
    }

    /// The ISO week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self::starting(date - Duration::days(offset))
    }

    /// Seven days beginning on `start`.
    pub fn starting(start: NaiveDate) -> Self {
        let iso = start.iso_week();
        Self {
            start,
            end: start + Duration::days(DAYS_PER_PERIOD as i64 - 1),
            week_number: iso.week(),
            year: iso.year(),
        }
    }

    /// Calendar date of day `index` (0-based).
    pub fn date(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    /// All seven dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..DAYS_PER_PERIOD).map(|i| self.date(i)).collect()
    }

    /// Weekday name of day `index`.
    pub fn day_name(&self, index: usize) -> &'static str {
        DAY_NAMES[self.date(index).weekday().num_days_from_monday() as usize]
    }

    /// "Week 7, 2026 (February 09 - February 15, 2026)"
    pub fn formatted(&self) -> String {
        format!(
            "Week {}, {} ({} - {})",
            self.week_number,
            self.year,
            self.start.format("%B %d"),
            self.end.format("%B %d, %Y")
        )
    }

    /// Stable artifact key, e.g. "2026-W07".
    pub fn key(&self) -> String {
        format!("{}-W{:02}", self.year, self.week_number)
    }

    /// Number of days between start and end, inclusive.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PeriodError {
    #[error("Week {week} does not exist in ISO year {year}")]
    InvalidWeek { year: i32, week: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_week_starts_on_monday() {
        let period = ReportPeriod::iso_week(2026, 7).unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2026, 2, 9).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
        assert_eq!(period.day_name(0), "Monday");
        assert_eq!(period.day_name(6), "Sunday");
        assert_eq!(period.key(), "2026-W07");
    }

    #[test]
    fn test_formatted() {
        let period = ReportPeriod::iso_week(2026, 7).unwrap();
        assert_eq!(
            period.formatted(),
            "Week 7, 2026 (February 09 - February 15, 2026)"
        );
    }

    #[test]
    fn test_containing_crosses_year() {
        // 2027-01-01 is a Friday in ISO week 53 of 2026
        let period = ReportPeriod::containing(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
        assert_eq!(period.year, 2026);
        assert_eq!(period.week_number, 53);
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2026, 12, 28).unwrap());
    }

    #[test]
    fn test_starting_midweek() {
        let period = ReportPeriod::starting(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        assert_eq!(period.day_name(0), "Wednesday");
        assert_eq!(period.span_days(), 7);
    }

    #[test]
    fn test_invalid_week() {
        assert!(ReportPeriod::iso_week(2025, 53).is_err());
    }
}
