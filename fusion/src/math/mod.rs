//! Integer intervals and affine bounding helpers shared by every stage.

mod interval;

pub use interval::Interval;

use glam::{DAffine3, DVec3};

/// Determinant magnitude below which an affine transform is treated as singular.
pub(crate) const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Real-valued axis-aligned bounds of `transform` applied to the corners of `interval`.
///
/// Exact for affine maps since the image of a box is the convex hull of its corners.
pub fn transformed_bounds(transform: &DAffine3, interval: &Interval) -> (DVec3, DVec3) {
    let mut lo = DVec3::splat(f64::INFINITY);
    let mut hi = DVec3::splat(f64::NEG_INFINITY);
    for corner in interval.corners() {
        let p = transform.transform_point3(corner);
        lo = lo.min(p);
        hi = hi.max(p);
    }
    (lo, hi)
}

/// Whether `transform` can be inverted without blowing up.
#[inline]
pub fn is_invertible(transform: &DAffine3) -> bool {
    let det = transform.matrix3.determinant();
    det.is_finite() && det.abs() > SINGULAR_DETERMINANT
}
