//! Unit tests for GRIB2 section parsing functions.
//!
//! These tests don't require test data files and focus on individual functions.

use grib2_parser::sections::{
    decode_grib2_signed, decode_grib2_signed_i16, parse_bitmap, parse_grid_definition,
    parse_indicator,
};
use test_utils::Grib2Builder;

// ============================================================================
// decode_grib2_signed tests
// ============================================================================

#[test]
fn test_decode_grib2_signed_positive() {
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x00, 0x00]), 0);
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x03, 0xE8]), 1000);
    assert_eq!(decode_grib2_signed(&90_000_000_u32.to_be_bytes()), 90_000_000);
}

#[test]
fn test_decode_grib2_signed_negative() {
    // MSB set means negative; the rest is magnitude, not two's complement
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x00, 0x01]), -1);
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x03, 0xE8]), -1000);

    // 4.7S, southern tip of Kenya
    let bytes = (4_700_000_u32 | 0x8000_0000).to_be_bytes();
    assert_eq!(decode_grib2_signed(&bytes), -4_700_000);
}

#[test]
fn test_decode_grib2_signed_extremes() {
    assert_eq!(decode_grib2_signed(&[0x7F, 0xFF, 0xFF, 0xFF]), 2147483647);
    assert_eq!(decode_grib2_signed(&[0xFF, 0xFF, 0xFF, 0xFF]), -2147483647);
    // negative zero
    assert_eq!(decode_grib2_signed(&[0x80, 0x00, 0x00, 0x00]), 0);
}

#[test]
fn test_decode_grib2_signed_wrong_length() {
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x01]), 0);
    assert_eq!(decode_grib2_signed(&[]), 0);
    assert_eq!(decode_grib2_signed(&[0x00, 0x00, 0x00, 0x01, 0x00]), 0);
}

#[test]
fn test_decode_grib2_signed_i16() {
    assert_eq!(decode_grib2_signed_i16(0x00, 0x0A), 10);
    assert_eq!(decode_grib2_signed_i16(0x80, 0x0A), -10);
}

// ============================================================================
// Section parsing on synthetic messages
// ============================================================================

#[test]
fn test_parse_indicator_rejects_edition_1() {
    let mut data = Grib2Builder::new_gfs().build();
    data[7] = 1;
    assert!(parse_indicator(&data).is_err());
}

#[test]
fn test_parse_indicator_rejects_bad_magic() {
    let mut data = Grib2Builder::new_gfs().build();
    data[0] = b'X';
    assert!(parse_indicator(&data).is_err());
}

#[test]
fn test_grid_definition_southern_hemisphere() {
    let data = Grib2Builder::new_gfs()
        .with_grid(5, 4, 36.0, -1.0, 0.5)
        .build();
    let grid = parse_grid_definition(&data).unwrap();

    assert_eq!(grid.ni, 5);
    assert_eq!(grid.nj, 4);
    assert!((grid.first_latitude - (-1.0)).abs() < 1e-6);
    assert!((grid.last_latitude - (-2.5)).abs() < 1e-6);
    assert!((grid.first_longitude - 36.0).abs() < 1e-6);
    assert!((grid.last_longitude - 38.0).abs() < 1e-6);
    assert!((grid.i_increment - 0.5).abs() < 1e-6);
}

#[test]
fn test_bitmap_absent_and_present() {
    let plain = Grib2Builder::new_gfs().build();
    assert!(parse_bitmap(&plain).unwrap().is_none());

    let mut values = vec![300.0; 48];
    values[3] = f32::NAN;
    let masked = Grib2Builder::new_gfs().with_data(values).build();
    let bitmap = parse_bitmap(&masked).unwrap().expect("bitmap present");
    assert_eq!(bitmap.data.len(), 6);
    assert_eq!(bitmap.data[0], 0b1110_1111);
}
