//! Tests for BoundingBox operations.

use forecast_common::bbox::{BboxParseError, BoundingBox};

// ============================================================================
// Parsing tests
// ============================================================================

#[test]
fn test_parse_integer_corners() {
    let bbox = BoundingBox::parse("34,-5,42,5").unwrap();
    assert_eq!(bbox, BoundingBox::new(34.0, -5.0, 42.0, 5.0));
}

#[test]
fn test_parse_wrong_part_count() {
    assert!(matches!(
        BoundingBox::parse("34,-5,42"),
        Err(BboxParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_parse_bad_number() {
    match BoundingBox::parse("34,south,42,5") {
        Err(BboxParseError::InvalidNumber(part)) => assert_eq!(part, "south"),
        other => panic!("unexpected result: {:?}", other),
    }
}

// ============================================================================
// Geometry tests
// ============================================================================

#[test]
fn test_contains_point_edges() {
    let bbox = BoundingBox::kenya();
    assert!(bbox.contains_point(36.82, -1.29)); // Nairobi
    assert!(bbox.contains_point(bbox.min_x, bbox.max_y));
    assert!(!bbox.contains_point(32.58, 0.35)); // Kampala
}

#[test]
fn test_non_finite_is_invalid() {
    let bbox = BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0);
    assert!(!bbox.is_valid());
}
