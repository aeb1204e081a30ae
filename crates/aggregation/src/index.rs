//! Lookup from ward polygons to the grid points they cover.
//!
//! The snapshot grid is a regular lattice, so a ward's bounding box maps to
//! a column/row window by arithmetic and only the points in that window are
//! tested against the polygon.

use std::ops::RangeInclusive;

use boundaries::Boundary;
use forecast_common::{BoundingBox, GridSpec};
use geo::{Area, Coord, LineString, MultiPolygon, Polygon};

use crate::config::AggregationMethod;

/// Contribution of one grid point to a ward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    /// Row-major index into the snapshot arrays
    pub index: usize,
    /// 1.0 for point-in-polygon; covered fraction of the cell otherwise
    pub weight: f64,
}

/// Arithmetic spatial index over a regular grid.
#[derive(Debug, Clone)]
pub struct GridIndex {
    grid: GridSpec,
}

impl GridIndex {
    pub fn new(grid: GridSpec) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Column and row window of points whose coordinate lies in `bbox`.
    pub fn point_window(
        &self,
        bbox: &BoundingBox,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        self.grid.index_range(bbox)
    }

    /// Column and row window of cells whose rectangle touches `bbox`.
    pub fn cell_window(
        &self,
        bbox: &BoundingBox,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        let half_x = self.grid.dx / 2.0;
        let half_y = self.grid.dy / 2.0;
        self.grid.index_range(&BoundingBox::new(
            bbox.min_x - half_x,
            bbox.min_y - half_y,
            bbox.max_x + half_x,
            bbox.max_y + half_y,
        ))
    }

    /// Points contributing to `ward` under `method`.
    pub fn ward_points(&self, ward: &Boundary, method: AggregationMethod) -> Vec<WeightedPoint> {
        match method {
            AggregationMethod::PointInPolygon => self.points_inside(ward),
            AggregationMethod::AreaWeighted => self.overlapping_cells(ward),
        }
    }

    fn points_inside(&self, ward: &Boundary) -> Vec<WeightedPoint> {
        let Some((cols, rows)) = self.point_window(&ward.bbox) else {
            return Vec::new();
        };

        let mut points = Vec::new();
        for j in rows {
            let lat = self.grid.lat(j);
            for i in cols.clone() {
                if ward.contains(self.grid.lon(i), lat) {
                    points.push(WeightedPoint {
                        index: self.grid.flat_index(i, j),
                        weight: 1.0,
                    });
                }
            }
        }
        points
    }

    fn overlapping_cells(&self, ward: &Boundary) -> Vec<WeightedPoint> {
        let Some((cols, rows)) = self.cell_window(&ward.bbox) else {
            return Vec::new();
        };
        let cell_area = self.grid.dx * self.grid.dy;
        if cell_area <= 0.0 {
            return Vec::new();
        }

        let mut points = Vec::new();
        for j in rows {
            for i in cols.clone() {
                let cell = self.grid.cell_bounds(i, j);
                let fraction = overlap_area(&ward.geometry, &cell) / cell_area;
                if fraction > 1e-9 {
                    points.push(WeightedPoint {
                        index: self.grid.flat_index(i, j),
                        weight: fraction.min(1.0),
                    });
                }
            }
        }
        points
    }
}

/// Area of `geometry` inside the axis-aligned rectangle `cell`.
pub fn overlap_area(geometry: &MultiPolygon<f64>, cell: &BoundingBox) -> f64 {
    geometry
        .0
        .iter()
        .map(|polygon| {
            let outer = clipped_ring_area(polygon.exterior(), cell);
            let holes: f64 = polygon
                .interiors()
                .iter()
                .map(|ring| clipped_ring_area(ring, cell))
                .sum();
            (outer - holes).max(0.0)
        })
        .sum()
}

fn clipped_ring_area(ring: &LineString<f64>, cell: &BoundingBox) -> f64 {
    let clipped = clip_ring(ring, cell);
    if clipped.len() < 3 {
        return 0.0;
    }
    Polygon::new(LineString::from(clipped), vec![]).unsigned_area()
}

/// Sutherland-Hodgman clipping of a ring against a rectangle.
fn clip_ring(ring: &LineString<f64>, cell: &BoundingBox) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = ring.coords().copied().collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }

    let edges: [(fn(&Coord<f64>, f64) -> bool, Axis, f64); 4] = [
        (|c, v| c.x >= v, Axis::X, cell.min_x),
        (|c, v| c.x <= v, Axis::X, cell.max_x),
        (|c, v| c.y >= v, Axis::Y, cell.min_y),
        (|c, v| c.y <= v, Axis::Y, cell.max_y),
    ];

    for (inside, axis, value) in edges {
        if coords.is_empty() {
            break;
        }
        let input = std::mem::take(&mut coords);
        let mut prev = input[input.len() - 1];
        for &current in &input {
            let current_in = inside(&current, value);
            let prev_in = inside(&prev, value);
            if current_in {
                if !prev_in {
                    coords.push(axis.intersect(prev, current, value));
                }
                coords.push(current);
            } else if prev_in {
                coords.push(axis.intersect(prev, current, value));
            }
            prev = current;
        }
    }

    coords
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    /// Point where segment `a`-`b` crosses the line `axis = value`.
    fn intersect(self, a: Coord<f64>, b: Coord<f64>, value: f64) -> Coord<f64> {
        match self {
            Axis::X => {
                let t = (value - a.x) / (b.x - a.x);
                Coord {
                    x: value,
                    y: a.y + t * (b.y - a.y),
                }
            }
            Axis::Y => {
                let t = (value - a.y) / (b.y - a.y);
                Coord {
                    x: a.x + t * (b.x - a.x),
                    y: value,
                }
            }
        }
    }
}
