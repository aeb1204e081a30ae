//! Regular latitude/longitude grid geometry.
//!
//! Grids are held in one canonical orientation: point `(0, 0)` is the
//! north-west corner, `i` runs east and `j` runs south, and values are stored
//! row-major (`j * nx + i`). Decoders translate the source scanning order into
//! this layout with [`ScanMode::source_index`].

use std::ops::RangeInclusive;

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

const EDGE_EPSILON: f64 = 1e-9;

/// Definition of a regular lat/lon grid in canonical orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of points along a parallel (longitude direction)
    pub nx: usize,
    /// Number of points along a meridian (latitude direction)
    pub ny: usize,
    /// Longitude spacing in degrees (positive)
    pub dx: f64,
    /// Latitude spacing in degrees (positive)
    pub dy: f64,
    /// Longitude of the western-most column
    pub origin_lon: f64,
    /// Latitude of the northern-most row
    pub origin_lat: f64,
}

impl GridSpec {
    /// Create a grid from its north-west corner.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, origin_lon: f64, origin_lat: f64) -> Self {
        Self {
            nx,
            ny,
            dx: dx.abs(),
            dy: dy.abs(),
            origin_lon,
            origin_lat,
        }
    }

    /// Build the canonical grid from the first point in source scanning order.
    pub fn from_first_point(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        first_lon: f64,
        first_lat: f64,
        scan_mode: ScanMode,
    ) -> Self {
        let dx = dx.abs();
        let dy = dy.abs();
        let span_x = nx.saturating_sub(1) as f64 * dx;
        let span_y = ny.saturating_sub(1) as f64 * dy;

        let origin_lon = if scan_mode.i_negative {
            first_lon - span_x
        } else {
            first_lon
        };
        let origin_lat = if scan_mode.j_positive {
            first_lat + span_y
        } else {
            first_lat
        };

        Self::new(nx, ny, dx, dy, origin_lon, origin_lat)
    }

    /// Calculate the bounding box of the grid point centres.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.origin_lon,
            min_y: self.origin_lat - self.ny.saturating_sub(1) as f64 * self.dy,
            max_x: self.origin_lon + self.nx.saturating_sub(1) as f64 * self.dx,
            max_y: self.origin_lat,
        }
    }

    /// Longitude of column `i`.
    pub fn lon(&self, i: usize) -> f64 {
        self.origin_lon + i as f64 * self.dx
    }

    /// Latitude of row `j`.
    pub fn lat(&self, j: usize) -> f64 {
        self.origin_lat - j as f64 * self.dy
    }

    /// Column and row ranges of the grid points lying inside `bbox`.
    ///
    /// Returns `None` when no grid point falls in the box.
    pub fn index_range(
        &self,
        bbox: &BoundingBox,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        if self.is_empty() || self.dx == 0.0 || self.dy == 0.0 {
            return None;
        }

        let i_lo = ((bbox.min_x - self.origin_lon) / self.dx - EDGE_EPSILON).ceil();
        let i_hi = ((bbox.max_x - self.origin_lon) / self.dx + EDGE_EPSILON).floor();
        let j_lo = ((self.origin_lat - bbox.max_y) / self.dy - EDGE_EPSILON).ceil();
        let j_hi = ((self.origin_lat - bbox.min_y) / self.dy + EDGE_EPSILON).floor();

        let i_lo = i_lo.max(0.0);
        let j_lo = j_lo.max(0.0);
        let i_hi = i_hi.min(self.nx as f64 - 1.0);
        let j_hi = j_hi.min(self.ny as f64 - 1.0);

        if i_lo > i_hi || j_lo > j_hi {
            return None;
        }

        Some((
            i_lo as usize..=i_hi as usize,
            j_lo as usize..=j_hi as usize,
        ))
    }

    /// Rectangle of the cell centred on point `(i, j)`.
    pub fn cell_bounds(&self, i: usize, j: usize) -> BoundingBox {
        let lon = self.lon(i);
        let lat = self.lat(j);
        BoundingBox::new(
            lon - self.dx / 2.0,
            lat - self.dy / 2.0,
            lon + self.dx / 2.0,
            lat + self.dy / 2.0,
        )
    }

    /// Get the 1D array index for a canonical 2D grid position.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Nominal resolution in degrees (the coarser of the two spacings).
    pub fn resolution(&self) -> f64 {
        self.dx.max(self.dy)
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}

/// Scan mode flags for grid data ordering.
///
/// Based on GRIB2 scanning mode (Flag Table 3.4).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMode {
    /// +i direction: false = +x (east), true = -x (west)
    pub i_negative: bool,
    /// +j direction: false = -y (south), true = +y (north)
    pub j_positive: bool,
    /// Adjacent points: false = i direction, true = j direction
    pub j_consecutive: bool,
    /// Row scan direction alternates
    pub alternating_rows: bool,
}

impl ScanMode {
    /// Data starts at the north-west corner, rows run west to east,
    /// columns run north to south.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Create from GRIB2 flag byte.
    pub fn from_grib2_flag(flag: u8) -> Self {
        Self {
            i_negative: (flag & 0x80) != 0,
            j_positive: (flag & 0x40) != 0,
            j_consecutive: (flag & 0x20) != 0,
            alternating_rows: (flag & 0x10) != 0,
        }
    }

    /// Position in the source array of canonical point `(i, j)`.
    pub fn source_index(&self, i: usize, j: usize, nx: usize, ny: usize) -> usize {
        let mut i_src = if self.i_negative { nx - 1 - i } else { i };
        let j_src = if self.j_positive { ny - 1 - j } else { j };

        if self.j_consecutive {
            j_src + i_src * ny
        } else {
            if self.alternating_rows && j_src % 2 == 1 {
                i_src = nx - 1 - i_src;
            }
            i_src + j_src * nx
        }
    }
}
