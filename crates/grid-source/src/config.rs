//! Field selection and unit conversion for the grid source.
//!
//! Each weekly variable is read from one GRIB2 parameter at one level. The
//! defaults match GFS 0.25 degree surface output.

use forecast_common::{BoundingBox, GridVariable};
use serde::{Deserialize, Serialize};

/// GRIB2 level type codes.
pub mod level_types {
    /// Ground or water surface
    pub const SURFACE: u8 = 1;
    /// Specified height above ground (m)
    pub const HEIGHT_ABOVE_GROUND: u8 = 103;
}

/// Conversion from GRIB units to report units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    #[default]
    Identity,
    KelvinToCelsius,
    MetersPerSecondToKmh,
}

impl UnitConversion {
    pub fn apply(self, value: f32) -> f32 {
        match self {
            UnitConversion::Identity => value,
            UnitConversion::KelvinToCelsius => value - 273.15,
            UnitConversion::MetersPerSecondToKmh => value * 3.6,
        }
    }
}

/// Where one variable lives in the forecast file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSource {
    /// Parameter short name (e.g. "TMP")
    pub parameter: String,
    pub level_type: u8,
    /// Level value; `None` accepts any value of the level type
    #[serde(default)]
    pub level_value: Option<u32>,
    #[serde(default)]
    pub conversion: UnitConversion,
}

impl VariableSource {
    pub fn new(parameter: &str, level_type: u8, level_value: Option<u32>, conversion: UnitConversion) -> Self {
        Self {
            parameter: parameter.to_string(),
            level_type,
            level_value,
            conversion,
        }
    }

    /// True when a message with these identifiers carries this variable.
    pub fn matches(&self, parameter: &str, level_type: u8, level_value: u32) -> bool {
        self.parameter == parameter
            && self.level_type == level_type
            && self.level_value.map_or(true, |v| v == level_value)
    }
}

/// Grid source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSourceConfig {
    /// Region cropped out of the model grid
    pub region: BoundingBox,
    /// Prefix of the model run id, e.g. "gfs" gives "gfs.2026020900"
    pub model: String,
    pub temperature: VariableSource,
    pub rainfall: VariableSource,
    pub wind_speed: VariableSource,
    pub wind_gust: VariableSource,
    pub wind_u: VariableSource,
    pub wind_v: VariableSource,
    /// Compute wind speed from the U/V components when no speed field exists
    pub derive_wind_speed: bool,
}

impl Default for GridSourceConfig {
    fn default() -> Self {
        use level_types::*;
        Self {
            region: BoundingBox::kenya(),
            model: "gfs".to_string(),
            temperature: VariableSource::new(
                "TMP",
                HEIGHT_ABOVE_GROUND,
                Some(2),
                UnitConversion::KelvinToCelsius,
            ),
            rainfall: VariableSource::new("APCP", SURFACE, None, UnitConversion::Identity),
            wind_speed: VariableSource::new(
                "WIND",
                HEIGHT_ABOVE_GROUND,
                Some(10),
                UnitConversion::MetersPerSecondToKmh,
            ),
            wind_gust: VariableSource::new(
                "GUST",
                SURFACE,
                None,
                UnitConversion::MetersPerSecondToKmh,
            ),
            wind_u: VariableSource::new(
                "UGRD",
                HEIGHT_ABOVE_GROUND,
                Some(10),
                UnitConversion::MetersPerSecondToKmh,
            ),
            wind_v: VariableSource::new(
                "VGRD",
                HEIGHT_ABOVE_GROUND,
                Some(10),
                UnitConversion::MetersPerSecondToKmh,
            ),
            derive_wind_speed: true,
        }
    }
}

impl GridSourceConfig {
    pub fn source(&self, variable: GridVariable) -> &VariableSource {
        match variable {
            GridVariable::Temperature => &self.temperature,
            GridVariable::Rainfall => &self.rainfall,
            GridVariable::WindSpeed => &self.wind_speed,
            GridVariable::WindGust => &self.wind_gust,
            GridVariable::WindU => &self.wind_u,
            GridVariable::WindV => &self.wind_v,
        }
    }

    /// Variable carried by a message, if any.
    pub fn variable_for(&self, parameter: &str, level_type: u8, level_value: u32) -> Option<GridVariable> {
        ALL_VARIABLES
            .into_iter()
            .find(|&var| self.source(var).matches(parameter, level_type, level_value))
    }
}

const ALL_VARIABLES: [GridVariable; 6] = [
    GridVariable::Temperature,
    GridVariable::Rainfall,
    GridVariable::WindSpeed,
    GridVariable::WindGust,
    GridVariable::WindU,
    GridVariable::WindV,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        assert!((UnitConversion::KelvinToCelsius.apply(298.15) - 25.0).abs() < 1e-4);
        assert!((UnitConversion::MetersPerSecondToKmh.apply(10.0) - 36.0).abs() < 1e-4);
        assert!(UnitConversion::KelvinToCelsius.apply(f32::NAN).is_nan());
    }

    #[test]
    fn test_variable_lookup() {
        let config = GridSourceConfig::default();
        assert_eq!(
            config.variable_for("TMP", 103, 2),
            Some(GridVariable::Temperature)
        );
        assert_eq!(config.variable_for("TMP", 103, 80), None);
        // any surface level value is accepted for APCP
        assert_eq!(config.variable_for("APCP", 1, 0), Some(GridVariable::Rainfall));
        assert_eq!(config.variable_for("UGRD", 103, 10), Some(GridVariable::WindU));
        assert_eq!(config.variable_for("PRMSL", 101, 0), None);
    }
}
