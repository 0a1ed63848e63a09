//! Axis-aligned integer box in voxel coordinates.

use std::fmt;

use glam::{DVec3, I64Vec3};

/// Axis-aligned integer box with inclusive bounds.
///
/// A voxel `p` is inside if `min <= p <= max` on every axis. An interval with
/// `max < min` on any axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    min: I64Vec3,
    max: I64Vec3,
}

impl Interval {
    #[inline]
    pub const fn new(min: I64Vec3, max: I64Vec3) -> Self {
        Self { min, max }
    }

    /// Block request style constructor: `size` voxels starting at `origin`.
    #[inline]
    pub fn from_origin_size(origin: I64Vec3, size: [usize; 3]) -> Self {
        let size = I64Vec3::new(size[0] as i64, size[1] as i64, size[2] as i64);
        Self {
            min: origin,
            max: origin + size - I64Vec3::ONE,
        }
    }

    /// `[0, dims)` of an image.
    #[inline]
    pub fn from_dims(dims: [usize; 3]) -> Self {
        Self::from_origin_size(I64Vec3::ZERO, dims)
    }

    /// Smallest integer interval containing the real box `[lo, hi]`.
    pub fn enclosing(lo: DVec3, hi: DVec3) -> Self {
        let lo = lo.floor();
        let hi = hi.ceil();
        Self {
            min: I64Vec3::new(lo.x as i64, lo.y as i64, lo.z as i64),
            max: I64Vec3::new(hi.x as i64, hi.y as i64, hi.z as i64),
        }
    }

    #[inline]
    pub const fn min(&self) -> I64Vec3 {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> I64Vec3 {
        self.max
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.cmplt(self.min).any()
    }

    /// Number of voxels along each axis (zero for empty intervals).
    #[inline]
    pub fn size(&self) -> [usize; 3] {
        let extent = (self.max - self.min + I64Vec3::ONE).max(I64Vec3::ZERO);
        [extent.x as usize, extent.y as usize, extent.z as usize]
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        let [w, h, d] = self.size();
        w * h * d
    }

    #[inline]
    pub fn contains_point(&self, p: I64Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    #[inline]
    pub fn contains(&self, other: &Interval) -> bool {
        other.is_empty() || (self.contains_point(other.min) && self.contains_point(other.max))
    }

    #[inline]
    pub fn intersects(&self, other: &Interval) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.cmple(other.max).all()
            && other.min.cmple(self.max).all()
    }

    /// Overlap of two intervals, `None` when they are disjoint.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let result = Interval {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        (!result.is_empty()).then_some(result)
    }

    #[inline]
    pub fn translate(&self, offset: I64Vec3) -> Interval {
        Interval {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Grow by `margin` voxels on both sides of each axis.
    #[inline]
    pub fn expand(&self, margin: I64Vec3) -> Interval {
        Interval {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// The eight corner voxels as real coordinates.
    pub fn corners(&self) -> [DVec3; 8] {
        let lo = self.min.as_dvec3();
        let hi = self.max.as_dvec3();
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}] -> [{}, {}, {}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
