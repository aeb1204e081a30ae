//! Shared test utilities for the ward forecast workspace.
//!
//! - Synthetic GRIB2 messages and multi-day forecast files
//! - Synthetic county/ward boundary GeoJSON
//! - Approximate float assertions
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod boundaries;
pub mod grib2;

pub use boundaries::{BoundaryFixture, GridLayout, KENYA_TEST_GRID};
pub use grib2::{Field, ForecastFileBuilder, Grib2Builder};

use std::path::PathBuf;

/// Write `contents` to `name` inside a fresh temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn write_temp_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write temp file");
    (dir, path)
}

/// Assert that two numbers agree within a tolerance.
///
/// Operands are widened to `f64`, so `f32` grid values compare directly
/// against `f64` literals.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected, tolerance) = ($actual as f64, $expected as f64, $tolerance as f64);
        assert!(
            (actual - expected).abs() <= tolerance,
            "assertion failed: {} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tolerance,
            expected
        );
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_tolerance_accepts_close_values() {
        assert_approx_eq!(24.9996_f32, 25.0, 0.001);
        assert_approx_eq!(-3.375, -3.375001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_tolerance_rejects_distant_values() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_write_temp_file() {
        let (_dir, path) = super::write_temp_file("a.txt", b"hello");
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }
}
