//! Immutable county and ward boundary store.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use forecast_common::{compare_ids, BoundingBox};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{BoundaryLoadError, Result};
use crate::geometry::{self, GeometryJson};
use crate::knbs::{self, KNBS_COUNTIES};

/// Administrative tier of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLevel {
    County,
    Ward,
}

/// A county or ward polygon.
#[derive(Debug, Clone)]
pub struct Boundary {
    pub id: String,
    pub name: String,
    pub level: BoundaryLevel,
    /// County id for wards, `None` for counties
    pub parent_id: Option<String>,
    pub geometry: MultiPolygon<f64>,
    pub bbox: BoundingBox,
}

impl Boundary {
    /// Point-in-polygon test against this boundary.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains_point(lon, lat) && geometry::contains(&self.geometry, lon, lat)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollectionJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<FeatureJson>,
}

#[derive(Debug, Deserialize)]
struct FeatureJson {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    geometry: Option<GeometryJson>,
}

/// Loaded boundaries. Counties are keyed by KNBS code, wards by ward id.
///
/// A store that exists always holds all 47 counties and every ward's parent
/// resolves to one of them.
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    counties: BTreeMap<String, Boundary>,
    wards: HashMap<String, Boundary>,
    /// County id -> ward ids sorted with [`compare_ids`]
    wards_by_county: HashMap<String, Vec<String>>,
}

impl BoundaryStore {
    /// Parse a GeoJSON FeatureCollection of counties and wards.
    #[instrument(skip(source), fields(bytes = source.len()))]
    pub fn load(source: &str) -> Result<Self> {
        let collection: FeatureCollectionJson = serde_json::from_str(source)?;
        if collection.kind != "FeatureCollection" {
            return Err(BoundaryLoadError::NotFeatureCollection(collection.kind));
        }

        let mut counties: BTreeMap<String, Boundary> = BTreeMap::new();
        let mut wards: HashMap<String, Boundary> = HashMap::new();

        for (index, feature) in collection.features.into_iter().enumerate() {
            let boundary = parse_feature(index, feature)?;

            if counties.contains_key(&boundary.id) || wards.contains_key(&boundary.id) {
                return Err(BoundaryLoadError::DuplicateId(boundary.id));
            }

            match boundary.level {
                BoundaryLevel::County => {
                    let mut boundary = boundary;
                    let info = knbs::lookup(&boundary.id)
                        .ok_or_else(|| BoundaryLoadError::UnknownCounty(boundary.id.clone()))?;
                    if boundary.name != info.name {
                        warn!(
                            county_id = %boundary.id,
                            source_name = %boundary.name,
                            table_name = info.name,
                            "County name differs from the KNBS table, using the table name"
                        );
                        boundary.name = info.name.to_string();
                    }
                    counties.insert(boundary.id.clone(), boundary);
                }
                BoundaryLevel::Ward => {
                    wards.insert(boundary.id.clone(), boundary);
                }
            }
        }

        let missing: Vec<String> = KNBS_COUNTIES
            .iter()
            .filter(|c| !counties.contains_key(c.code))
            .map(|c| c.code.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BoundaryLoadError::MissingCounties(missing));
        }

        let mut wards_by_county: HashMap<String, Vec<String>> = HashMap::new();
        for ward in wards.values() {
            match ward.parent_id.as_deref() {
                Some(parent) if counties.contains_key(parent) => {
                    wards_by_county
                        .entry(parent.to_string())
                        .or_default()
                        .push(ward.id.clone());
                }
                _ => {
                    return Err(BoundaryLoadError::OrphanWard {
                        ward_id: ward.id.clone(),
                        parent_id: ward.parent_id.clone(),
                    })
                }
            }
        }
        for ids in wards_by_county.values_mut() {
            ids.sort_by(|a, b| compare_ids(a, b));
        }

        info!(
            counties = counties.len(),
            wards = wards.len(),
            "Loaded boundaries"
        );

        Ok(Self {
            counties,
            wards,
            wards_by_county,
        })
    }

    /// Read and parse a GeoJSON file.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| BoundaryLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(&source)
    }

    /// Wards of a county ordered by ward id; empty for unknown counties.
    pub fn wards_of(&self, county_id: &str) -> Vec<&Boundary> {
        self.wards_by_county
            .get(county_id)
            .map(|ids| ids.iter().filter_map(|id| self.wards.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn county(&self, id: &str) -> Option<&Boundary> {
        self.counties.get(id)
    }

    pub fn ward(&self, id: &str) -> Option<&Boundary> {
        self.wards.get(id)
    }

    /// All counties in KNBS code order.
    pub fn counties(&self) -> impl Iterator<Item = &Boundary> {
        self.counties.values()
    }

    pub fn county_count(&self) -> usize {
        self.counties.len()
    }

    pub fn ward_count(&self) -> usize {
        self.wards.len()
    }

    /// Point-in-polygon predicate.
    pub fn contains(polygon: &MultiPolygon<f64>, lon: f64, lat: f64) -> bool {
        geometry::contains(polygon, lon, lat)
    }

    /// Polygon intersection predicate.
    pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        geometry::intersects(a, b)
    }
}

fn parse_feature(index: usize, feature: FeatureJson) -> Result<Boundary> {
    let props = &feature.properties;
    let id = property_string(props, "id").ok_or(BoundaryLoadError::MissingProperty {
        index,
        property: "id",
    })?;
    let name = property_string(props, "name").ok_or(BoundaryLoadError::MissingProperty {
        index,
        property: "name",
    })?;
    let level = match property_string(props, "level").as_deref() {
        Some("county") => BoundaryLevel::County,
        Some("ward") => BoundaryLevel::Ward,
        Some(other) => {
            return Err(BoundaryLoadError::InvalidLevel {
                id,
                level: other.to_string(),
            })
        }
        None => {
            return Err(BoundaryLoadError::MissingProperty {
                index,
                property: "level",
            })
        }
    };
    let parent_id = property_string(props, "parent_id");

    if id.trim().is_empty() {
        return Err(BoundaryLoadError::MissingProperty {
            index,
            property: "id",
        });
    }

    let geometry_json = feature
        .geometry
        .ok_or_else(|| BoundaryLoadError::InvalidGeometry {
            id: id.clone(),
            reason: "geometry is null".to_string(),
        })?;
    let geometry = geometry::parse_geometry(&geometry_json).map_err(|reason| {
        BoundaryLoadError::InvalidGeometry {
            id: id.clone(),
            reason,
        }
    })?;
    let bbox = geometry::bounding_box(&geometry).ok_or_else(|| BoundaryLoadError::InvalidGeometry {
        id: id.clone(),
        reason: "geometry is empty".to_string(),
    })?;

    Ok(Boundary {
        id,
        name,
        level,
        parent_id: if level == BoundaryLevel::Ward {
            parent_id
        } else {
            None
        },
        geometry,
        bbox,
    })
}

/// String or integer property as text.
fn property_string(props: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
