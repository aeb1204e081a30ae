//! Forecast variables carried through the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A gridded forecast field after unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridVariable {
    /// 2 m air temperature, degrees Celsius
    Temperature,
    /// Precipitation depth, millimetres
    Rainfall,
    /// 10 m wind speed, km/h
    WindSpeed,
    /// Surface wind gust, km/h
    WindGust,
    /// 10 m eastward wind component, km/h
    WindU,
    /// 10 m northward wind component, km/h
    WindV,
}

impl GridVariable {
    /// Variables every weekly forecast needs.
    pub const REQUIRED: [GridVariable; 4] = [
        GridVariable::Temperature,
        GridVariable::Rainfall,
        GridVariable::WindSpeed,
        GridVariable::WindGust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GridVariable::Temperature => "temperature",
            GridVariable::Rainfall => "rainfall",
            GridVariable::WindSpeed => "wind_speed",
            GridVariable::WindGust => "wind_gust",
            GridVariable::WindU => "wind_u",
            GridVariable::WindV => "wind_v",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            GridVariable::Temperature => "°C",
            GridVariable::Rainfall => "mm",
            _ => "km/h",
        }
    }
}

impl fmt::Display for GridVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(GridVariable::Temperature),
            "rainfall" => Ok(GridVariable::Rainfall),
            "wind_speed" => Ok(GridVariable::WindSpeed),
            "wind_gust" => Ok(GridVariable::WindGust),
            "wind_u" => Ok(GridVariable::WindU),
            "wind_v" => Ok(GridVariable::WindV),
            other => Err(format!("unknown variable: {}", other)),
        }
    }
}
