//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// `x` is longitude (positive east, -180..180) and `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Region covering Kenya with a small margin for boundary cells.
    pub fn kenya() -> Self {
        Self::new(33.5, -5.0, 42.0, 5.5)
    }

    /// Parse a "min_lon,min_lat,max_lon,max_lat" string.
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(BboxParseError::Inverted(s.to_string()));
        }
        Ok(bbox)
    }

    /// True when all corners are finite and min <= max on both axes.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'min_lon,min_lat,max_lon,max_lat'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),

    #[error("Bbox corners are inverted or non-finite: {0}")]
    Inverted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = BoundingBox::parse("33.5, -5.0, 42.0, 5.5").unwrap();
        assert_eq!(bbox, BoundingBox::kenya());
    }

    #[test]
    fn test_parse_rejects_inverted() {
        assert!(matches!(
            BoundingBox::parse("42.0,-5.0,33.5,5.5"),
            Err(BboxParseError::Inverted(_))
        ));
    }
}
