//! GeoJSON geometry parsing and spatial predicates.

use forecast_common::BoundingBox;
use geo::{BoundingRect, Contains, Coord, Intersects, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::Value;

/// Raw GeoJSON geometry object.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

/// Convert a Polygon or MultiPolygon geometry into a validated
/// [`MultiPolygon`]. The error is a human readable reason.
pub fn parse_geometry(geometry: &GeometryJson) -> Result<MultiPolygon<f64>, String> {
    match geometry.kind.as_str() {
        "Polygon" => Ok(MultiPolygon::new(vec![parse_polygon(&geometry.coordinates)?])),
        "MultiPolygon" => {
            let parts = geometry
                .coordinates
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array")?;
            if parts.is_empty() {
                return Err("MultiPolygon has no polygons".to_string());
            }
            let polygons = parts.iter().map(parse_polygon).collect::<Result<Vec<_>, _>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(format!("unsupported geometry type {other}")),
    }
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>, String> {
    let rings = value.as_array().ok_or("Polygon coordinates must be an array")?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings.next().ok_or("Polygon has no rings")??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>, String> {
    let positions = value.as_array().ok_or("ring must be an array of positions")?;
    if positions.len() < 4 {
        return Err(format!("ring has {} positions, at least 4 required", positions.len()));
    }

    let coords = positions.iter().map(parse_position).collect::<Result<Vec<_>, _>>()?;
    if coords.first() != coords.last() {
        return Err("ring is not closed".to_string());
    }
    Ok(LineString::new(coords))
}

fn parse_position(value: &Value) -> Result<Coord<f64>, String> {
    let pair = value.as_array().ok_or("position must be an array")?;
    let (Some(x), Some(y)) = (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) else {
        return Err(format!("position {value} is not [lon, lat]"));
    };

    if !x.is_finite() || !y.is_finite() || !(-180.0..=180.0).contains(&x) || !(-90.0..=90.0).contains(&y) {
        return Err(format!("position [{x}, {y}] is out of range"));
    }
    Ok(Coord { x, y })
}

/// Bounding box of a geometry.
pub fn bounding_box(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    geometry
        .bounding_rect()
        .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
}

/// Point-in-polygon test; points on the boundary are not contained.
pub fn contains(polygon: &MultiPolygon<f64>, lon: f64, lat: f64) -> bool {
    polygon.contains(&Point::new(lon, lat))
}

/// True when the two geometries share any point.
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.intersects(b)
}
