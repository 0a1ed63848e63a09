//! Separable per-axis weights evaluated in view-local coordinates.
//!
//! A weight is the product of one 1-D profile per axis. Blocks are filled
//! either per voxel through an arbitrary output -> local mapping, or
//! incrementally along each output scanline when the mapping is affine: the
//! local coordinate then moves by a constant step per voxel, so threshold
//! comparisons become index ranges computed once per scanline.

use std::fmt;
use std::ops::Range;

use common::Buffer3;
use glam::{DAffine3, DVec3};

/// Local-coordinate steps below this are treated as constant along a scanline.
const STEP_EPSILON: f64 = 1e-10;

/// Breakpoints of a 1-D profile: zero outside `[b0, b3]`, ramps on
/// `[b0, b1)` and `(b2, b3]`, full weight on `[b1, b2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisProfile {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
}

impl AxisProfile {
    /// Profile of an axis with `dim` voxels.
    ///
    /// When the two ramps would overlap, `b1` and `b2` collapse to their
    /// midpoint and the profile has no full-weight interior.
    pub fn new(dim: usize, border: f64, blend: f64) -> Self {
        let last = dim as f64 - 1.0;
        let b0 = border;
        let b3 = last - border;
        let mut b1 = border + blend;
        let mut b2 = last - border - blend;
        if b1 > b2 {
            let mid = 0.5 * (b1 + b2);
            b1 = mid;
            b2 = mid;
        }
        Self { b0, b1, b2, b3 }
    }

    #[inline]
    pub fn support(&self) -> (f64, f64) {
        (self.b0, self.b3)
    }

    /// Interval of full weight, `None` when degenerate or collapsed to a point.
    #[inline]
    pub fn plateau(&self) -> Option<(f64, f64)> {
        (self.b1 >= self.b0 && self.b2 <= self.b3 && self.b1 < self.b2)
            .then_some((self.b1, self.b2))
    }
}

/// A weight generator that factors into per-axis profiles.
pub trait SeparableWeight: Send + Sync + fmt::Debug {
    fn profile(&self, axis: usize) -> &AxisProfile;

    /// 1-D weight along `axis` at local coordinate `l`.
    fn axis_weight(&self, axis: usize, l: f64) -> f32;

    /// Weight at a view-local position.
    #[inline]
    fn weight_at(&self, local: DVec3) -> f32 {
        let mut w = self.axis_weight(0, local.x);
        if w == 0.0 {
            return 0.0;
        }
        w *= self.axis_weight(1, local.y);
        if w == 0.0 {
            return 0.0;
        }
        w * self.axis_weight(2, local.z)
    }

    /// Fill `out` with weights of the block whose voxel `(x, y, z)` maps to
    /// `local_at(x, y, z)` in view-local coordinates.
    fn fill_general<F>(&self, out: &mut Buffer3<f32>, local_at: F)
    where
        F: Fn(usize, usize, usize) -> DVec3,
        Self: Sized,
    {
        let [width, height, depth] = out.dims();
        for z in 0..depth {
            for y in 0..height {
                let row = out.row_mut(y, z);
                for (x, value) in row.iter_mut().enumerate().take(width) {
                    *value = self.weight_at(local_at(x, y, z));
                }
            }
        }
    }

    /// Fill `out` with weights of a block mapped affinely into the view.
    ///
    /// `block_to_local` maps block-local voxel indices to view-local coordinates.
    fn fill_incremental(&self, out: &mut Buffer3<f32>, block_to_local: &DAffine3)
    where
        Self: Sized,
    {
        let [width, height, depth] = out.dims();
        let step = block_to_local.matrix3.x_axis;
        for z in 0..depth {
            for y in 0..height {
                let start = block_to_local.transform_point3(DVec3::new(0.0, y as f64, z as f64));
                let row = out.row_mut(y, z);
                row.fill(1.0);
                for axis in 0..3 {
                    if !apply_axis(self, axis, start[axis], step[axis], row) {
                        break;
                    }
                }
                debug_assert_eq!(row.len(), width);
            }
        }
    }
}

/// Multiply `row` by the `axis` profile along the scanline `start + x·step`.
///
/// Returns `false` once the whole row is zero.
fn apply_axis<W: SeparableWeight>(
    weight: &W,
    axis: usize,
    start: f64,
    step: f64,
    row: &mut [f32],
) -> bool {
    if step.abs() < STEP_EPSILON {
        let w = weight.axis_weight(axis, start);
        if w == 0.0 {
            row.fill(0.0);
            return false;
        }
        if w != 1.0 {
            row.iter_mut().for_each(|v| *v *= w);
        }
        return true;
    }

    let profile = weight.profile(axis);
    let (lo, hi) = profile.support();
    let support = index_range(start, step, lo, hi, row.len());
    if support.is_empty() {
        row.fill(0.0);
        return false;
    }
    row[..support.start].fill(0.0);
    row[support.end..].fill(0.0);

    let plateau = profile
        .plateau()
        .map(|(lo, hi)| index_range(start, step, lo, hi, row.len()))
        .filter(|r| !r.is_empty())
        .unwrap_or(support.start..support.start);

    let ramp = |x: usize| weight.axis_weight(axis, start + x as f64 * step);
    for x in support.start..plateau.start {
        row[x] *= ramp(x);
    }
    for x in plateau.end..support.end {
        row[x] *= ramp(x);
    }
    true
}

/// Indices `x` in `[0, n)` with `lo <= start + x·step <= hi`, for `step != 0`.
///
/// The closed-form estimate is corrected against the same expression used
/// for per-voxel evaluation, so boundary voxels are classified consistently.
pub(crate) fn index_range(start: f64, step: f64, lo: f64, hi: f64, n: usize) -> Range<usize> {
    if !(lo <= hi) {
        return 0..0;
    }
    let inside = |x: usize| {
        let l = start + x as f64 * step;
        l >= lo && l <= hi
    };
    let (a, b) = if step > 0.0 {
        ((lo - start) / step, (hi - start) / step)
    } else {
        ((hi - start) / step, (lo - start) / step)
    };
    let clamp = |v: f64| v.clamp(0.0, n as f64) as usize;
    let mut first = clamp(a.ceil());
    let mut end = clamp(b.floor() + 1.0).max(first);

    while first > 0 && inside(first - 1) {
        first -= 1;
    }
    while first < end && !inside(first) {
        first += 1;
    }
    end = end.max(first);
    while end < n && inside(end) {
        end += 1;
    }
    while end > first && !inside(end - 1) {
        end -= 1;
    }
    first..end
}
