//! GRIB2 parameter and level lookup tables.
//!
//! Translate numeric GRIB2 codes into the short names and level descriptions
//! used to select fields. [`Grib2Tables::gfs`] carries the GFS defaults; the
//! grid source configuration can extend them.

use std::collections::HashMap;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Level description - either static text or a template with {value} placeholder
#[derive(Debug, Clone)]
pub enum LevelDescription {
    /// Static description (e.g., "surface", "mean sea level")
    Static(String),
    /// Template with {value} placeholder (e.g., "{value} m above ground")
    Template(String),
}

impl LevelDescription {
    /// Format the level description, substituting `{value}` if it's a template.
    pub fn format(&self, value: u32) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => t.replace("{value}", &value.to_string()),
        }
    }
}

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    /// (discipline, category, number) -> parameter short name (e.g., "TMP", "UGRD")
    parameters: HashMap<ParamKey, String>,
    /// level_type -> description pattern
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables covering the GFS surface fields used for weekly outlooks.
    pub fn gfs() -> Self {
        let mut tables = Self::new();

        for (category, number, name) in [
            (0, 0, "TMP"),
            (0, 4, "TMAX"),
            (0, 5, "TMIN"),
            (1, 1, "RH"),
            (1, 7, "PRATE"),
            (1, 8, "APCP"),
            (2, 0, "WDIR"),
            (2, 1, "WIND"),
            (2, 2, "UGRD"),
            (2, 3, "VGRD"),
            (2, 22, "GUST"),
            (3, 0, "PRES"),
            (3, 1, "PRMSL"),
            (6, 1, "TCDC"),
        ] {
            tables.add_parameter(0, category, number, name.to_string());
        }

        tables.add_level(1, LevelDescription::Static("surface".to_string()));
        tables.add_level(101, LevelDescription::Static("mean sea level".to_string()));
        tables.add_level(
            103,
            LevelDescription::Template("{value} m above ground".to_string()),
        );
        tables.add_level(
            200,
            LevelDescription::Static("entire atmosphere".to_string()),
        );

        tables
    }

    /// Add a parameter mapping
    pub fn add_parameter(&mut self, discipline: u8, category: u8, number: u8, name: String) {
        self.parameters.insert((discipline, category, number), name);
    }

    /// Add a level description mapping
    pub fn add_level(&mut self, level_type: u8, description: LevelDescription) {
        self.levels.insert(level_type, description);
    }

    /// Look up parameter short name by GRIB2 codes.
    ///
    /// Returns "P{discipline}_{category}_{number}" if not found.
    pub fn get_parameter_name(&self, discipline: u8, category: u8, number: u8) -> String {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(|| format!("P{}_{}_{}", discipline, category, number))
    }

    /// Codes registered for a short name.
    pub fn find_parameter(&self, name: &str) -> Option<ParamKey> {
        self.parameters
            .iter()
            .find(|(_, v)| v.as_str() == name)
            .map(|(k, _)| *k)
    }

    /// Look up level description by type code and value.
    ///
    /// Returns "Level type {type} value {value}" if not found.
    pub fn get_level_description(&self, level_type: u8, level_value: u32) -> String {
        match self.levels.get(&level_type) {
            Some(desc) => desc.format(level_value),
            None => format!("Level type {} value {}", level_type, level_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gfs_parameters() {
        let tables = Grib2Tables::gfs();

        assert_eq!(tables.get_parameter_name(0, 0, 0), "TMP");
        assert_eq!(tables.get_parameter_name(0, 1, 8), "APCP");
        assert_eq!(tables.get_parameter_name(0, 2, 22), "GUST");
        assert_eq!(tables.find_parameter("VGRD"), Some((0, 2, 3)));
    }

    #[test]
    fn test_parameter_not_found() {
        let tables = Grib2Tables::gfs();

        assert_eq!(tables.get_parameter_name(99, 99, 99), "P99_99_99");
        assert_eq!(tables.find_parameter("REFL"), None);
    }

    #[test]
    fn test_level_descriptions() {
        let tables = Grib2Tables::gfs();

        assert_eq!(tables.get_level_description(1, 0), "surface");
        assert_eq!(tables.get_level_description(103, 2), "2 m above ground");
        assert_eq!(tables.get_level_description(103, 10), "10 m above ground");
        assert_eq!(
            tables.get_level_description(99, 123),
            "Level type 99 value 123"
        );
    }

    #[test]
    fn test_empty_tables() {
        let tables = Grib2Tables::new();

        assert_eq!(tables.get_parameter_name(0, 0, 0), "P0_0_0");
    }
}
