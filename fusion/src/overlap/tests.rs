//! Tests for the overlap index.

use glam::{DAffine3, DVec3, I64Vec3};

use super::*;
use crate::testing::{constant_source, constant_view};

fn two_views() -> Vec<View> {
    vec![
        constant_view(0, [256, 256, 256], DVec3::ZERO, 1.0),
        constant_view(1, [256, 256, 256], DVec3::new(128.0, 0.0, 0.0), 2.0),
    ]
}

fn interval(min: [i64; 3], max: [i64; 3]) -> Interval {
    Interval::new(I64Vec3::from_array(min), I64Vec3::from_array(max))
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_build_grows_boxes_by_margin() {
    let index = OverlapIndex::build(&two_views(), 2, 3).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.entries()[0].bbox, interval([-2, -2, -2], [257, 257, 257]));
    assert_eq!(index.entries()[1].bbox, interval([126, -2, -2], [385, 257, 257]));
    assert_eq!(index.entries()[1].id, ViewId(1));
    assert_eq!(index.entries()[1].position, 1);
}

#[test]
fn test_build_rounds_fractional_bounds_outward() {
    let view = constant_view(4, [10, 10, 10], DVec3::new(0.5, -0.25, 0.0), 1.0);
    let index = OverlapIndex::build(&[view], 0, 3).unwrap();
    assert_eq!(index.entries()[0].bbox, interval([0, -1, 0], [10, 9, 9]));
}

#[test]
fn test_build_rotated_view_covers_every_corner() {
    let view = View::affine(
        ViewId(0),
        DAffine3::from_rotation_z(std::f64::consts::FRAC_PI_4),
        constant_source([11, 11, 3], 1.0),
    );
    let index = OverlapIndex::build(&[view], 0, 3).unwrap();
    let bbox = index.entries()[0].bbox;

    // Corner (10, 0) lands at (7.07, 7.07); corner (0, 10) at (-7.07, 7.07)
    assert_eq!(bbox.min().x, -8);
    assert_eq!(bbox.max().x, 8);
    assert_eq!(bbox.min().y, 0);
    assert_eq!(bbox.max().y, 15);
}

#[test]
fn test_build_two_dimensional_flattens_z() {
    let view = constant_view(0, [16, 16, 1], DVec3::new(0.0, 0.0, 5.0), 1.0);
    let index = OverlapIndex::build(&[view], 3, 2).unwrap();
    assert_eq!(index.entries()[0].bbox, interval([-3, -3, 0], [18, 18, 0]));
}

#[test]
fn test_build_rejects_other_dimensionality() {
    assert_eq!(
        OverlapIndex::build(&two_views(), 2, 4),
        Err(ConfigError::UnsupportedDimensionality { n_dims: 4 })
    );
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_query_preserves_construction_order() {
    let index = OverlapIndex::build(&two_views(), 0, 3).unwrap();

    assert_eq!(
        index.query(I64Vec3::new(200, 0, 0), I64Vec3::new(210, 10, 10)),
        vec![0, 1]
    );
    assert_eq!(
        index.query(I64Vec3::new(0, 0, 0), I64Vec3::new(10, 10, 10)),
        vec![0]
    );
    assert_eq!(
        index.query(I64Vec3::new(300, 0, 0), I64Vec3::new(310, 10, 10)),
        vec![1]
    );
    assert!(
        index
            .query(I64Vec3::new(500, 0, 0), I64Vec3::new(510, 10, 10))
            .is_empty()
    );
}

#[test]
fn test_query_touching_boundary_is_inclusive() {
    let index = OverlapIndex::build(&two_views(), 0, 3).unwrap();
    // View 0 ends at x = 255 inclusive
    assert_eq!(
        index.query(I64Vec3::new(255, 0, 0), I64Vec3::new(255, 0, 0)),
        vec![0, 1]
    );
    assert_eq!(
        index.query(I64Vec3::new(256, 0, 0), I64Vec3::new(256, 0, 0)),
        vec![1]
    );
}

#[test]
fn test_filter_returns_subset_without_mutating() {
    let index = OverlapIndex::build(&two_views(), 0, 3).unwrap();
    let filtered = index.filter(&interval([300, 0, 0], [310, 10, 10]));

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.entries()[0].id, ViewId(1));
    assert_eq!(filtered.entries()[0].position, 1);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_offset_rebases_boxes() {
    let index = OverlapIndex::build(&two_views(), 0, 3).unwrap();
    let local = index.offset(I64Vec3::new(128, 64, 0));

    assert_eq!(local.entries()[0].bbox, interval([-128, -64, 0], [127, 191, 255]));
    assert_eq!(local.entries()[1].bbox, interval([0, -64, 0], [255, 191, 255]));
    // The original is untouched
    assert_eq!(index.entries()[0].bbox, interval([0, 0, 0], [255, 255, 255]));
}

#[test]
fn test_filter_then_offset_matches_query_on_block() {
    let index = OverlapIndex::build(&two_views(), 2, 3).unwrap();
    let block = Interval::from_origin_size(I64Vec3::new(256, 0, 0), [64, 64, 64]);
    let local = index.filter(&block).offset(block.min());

    let block_local = Interval::from_dims([64, 64, 64]);
    assert_eq!(local.query(block_local.min(), block_local.max()), vec![0, 1]);
    let positions: Vec<usize> = local.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 1]);
}
