//! Synthetic county and ward boundaries.
//!
//! The default layout tiles the 47 counties as 1 degree squares in a 7 x 7
//! lattice whose north-west corner is 34E 4N, each split into four vertical
//! ward strips. [`KENYA_TEST_GRID`] places grid points at x.125 / x.375 /
//! x.625 / x.875 degrees so no point ever sits on a polygon edge and every
//! ward contains exactly one column of four points.

use serde_json::{json, Value};

/// A regular grid expressed as its first point in GRIB scanning order
/// (north-west corner, rows running west to east).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub ni: u32,
    pub nj: u32,
    pub first_lon: f64,
    pub first_lat: f64,
    pub step: f64,
}

impl GridLayout {
    pub fn len(&self) -> usize {
        (self.ni * self.nj) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (min_lon, min_lat, max_lon, max_lat) of the point centres.
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        (
            self.first_lon,
            self.first_lat - (self.nj - 1) as f64 * self.step,
            self.first_lon + (self.ni - 1) as f64 * self.step,
            self.first_lat,
        )
    }
}

/// 0.25 degree grid covering the default county lattice with a margin.
pub const KENYA_TEST_GRID: GridLayout = GridLayout {
    ni: 32,
    nj: 32,
    first_lon: 33.625,
    first_lat: 4.375,
    step: 0.25,
};

/// Layout parameters for the synthetic boundary set.
#[derive(Debug, Clone)]
pub struct BoundaryFixture {
    /// Longitude of the lattice's western edge
    pub origin_lon: f64,
    /// Latitude of the lattice's northern edge
    pub origin_lat: f64,
    /// Side of each county square in degrees
    pub county_size: f64,
    /// Vertical ward strips per county
    pub wards_per_county: usize,
}

impl Default for BoundaryFixture {
    fn default() -> Self {
        Self {
            origin_lon: 34.0,
            origin_lat: 4.0,
            county_size: 1.0,
            wards_per_county: 4,
        }
    }
}

impl BoundaryFixture {
    /// (min_lon, min_lat, max_lon, max_lat) of county `code` (1-based).
    pub fn county_bounds(&self, code: usize) -> (f64, f64, f64, f64) {
        let index = code - 1;
        let col = (index % 7) as f64;
        let row = (index / 7) as f64;
        let min_lon = self.origin_lon + col * self.county_size;
        let max_lat = self.origin_lat - row * self.county_size;
        (
            min_lon,
            max_lat - self.county_size,
            min_lon + self.county_size,
            max_lat,
        )
    }

    /// Ward id for ward `n` (1-based) of county `code`, e.g. "0102".
    pub fn ward_id(code: usize, n: usize) -> String {
        format!("{:02}{:02}", code, n)
    }

    /// (min_lon, min_lat, max_lon, max_lat) of ward `n` (1-based) of `code`.
    pub fn ward_bounds(&self, code: usize, n: usize) -> (f64, f64, f64, f64) {
        let (min_lon, min_lat, _, max_lat) = self.county_bounds(code);
        let width = self.county_size / self.wards_per_county as f64;
        let west = min_lon + (n - 1) as f64 * width;
        (west, min_lat, west + width, max_lat)
    }

    /// County features for all 47 codes.
    pub fn county_features(&self) -> Vec<Value> {
        (1..=47)
            .map(|code| {
                let (a, b, c, d) = self.county_bounds(code);
                polygon_feature(
                    &format!("{:02}", code),
                    &format!("County {:02}", code),
                    "county",
                    None,
                    rectangle_ring(a, b, c, d),
                )
            })
            .collect()
    }

    /// Ward strips of one county.
    pub fn ward_features(&self, code: usize) -> Vec<Value> {
        let parent = format!("{:02}", code);
        (1..=self.wards_per_county)
            .map(|n| {
                let (a, b, c, d) = self.ward_bounds(code, n);
                let id = Self::ward_id(code, n);
                polygon_feature(
                    &id,
                    &format!("Ward {}", id),
                    "ward",
                    Some(&parent),
                    rectangle_ring(a, b, c, d),
                )
            })
            .collect()
    }

    /// Every county and ward feature.
    pub fn features(&self) -> Vec<Value> {
        let mut features = self.county_features();
        for code in 1..=47 {
            features.extend(self.ward_features(code));
        }
        features
    }

    /// Complete FeatureCollection JSON.
    pub fn geojson(&self) -> String {
        feature_collection(self.features())
    }
}

/// Closed counter-clockwise ring of a rectangle.
pub fn rectangle_ring(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<[f64; 2]> {
    vec![
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat],
    ]
}

/// A GeoJSON Feature with a single-ring Polygon.
pub fn polygon_feature(
    id: &str,
    name: &str,
    level: &str,
    parent_id: Option<&str>,
    ring: Vec<[f64; 2]>,
) -> Value {
    json!({
        "type": "Feature",
        "properties": {
            "id": id,
            "name": name,
            "level": level,
            "parent_id": parent_id,
        },
        "geometry": {
            "type": "Polygon",
            "coordinates": [ring],
        }
    })
}

/// Wrap features in a FeatureCollection document.
pub fn feature_collection(features: Vec<Value>) -> String {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
    .to_string()
}
