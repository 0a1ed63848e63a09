//! Random-access pixel sources and native sample types.

use std::fmt;

use common::Buffer3;

use crate::error::ExternalError;
use crate::math::Interval;

/// Native sample type of a view, convertible to and from the f32 working type.
pub trait Sample: Copy + Send + Sync + fmt::Debug + 'static {
    /// Upper end of the range targeted by linear output conversion.
    const MAX_VALUE: f32;

    fn to_working(self) -> f32;

    /// Round and clamp a working value into the native range.
    fn from_working(value: f32) -> Self;
}

impl Sample for u8 {
    const MAX_VALUE: f32 = u8::MAX as f32;

    #[inline]
    fn to_working(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_working(value: f32) -> Self {
        value.round().clamp(0.0, Self::MAX_VALUE) as u8
    }
}

impl Sample for u16 {
    const MAX_VALUE: f32 = u16::MAX as f32;

    #[inline]
    fn to_working(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_working(value: f32) -> Self {
        value.round().clamp(0.0, Self::MAX_VALUE) as u16
    }
}

impl Sample for f32 {
    const MAX_VALUE: f32 = 1.0;

    #[inline]
    fn to_working(self) -> f32 {
        self
    }

    #[inline]
    fn from_working(value: f32) -> Self {
        value
    }
}

/// How reads outside `[0, dims)` are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extension {
    /// Zero outside the image.
    #[default]
    Zero,
    /// Repeat the nearest edge voxel.
    Border,
    /// Reflect about the edge voxel without repeating it (`-1 -> 1`).
    Mirror,
}

impl Extension {
    /// Source index for coordinate `i` on an axis of length `n`, `None` for zero fill.
    #[inline]
    pub fn resolve(&self, i: i64, n: usize) -> Option<usize> {
        let n = n as i64;
        if (0..n).contains(&i) {
            return Some(i as usize);
        }
        match self {
            Extension::Zero => None,
            Extension::Border => Some(i.clamp(0, n - 1) as usize),
            Extension::Mirror => {
                if n == 1 {
                    return Some(0);
                }
                let period = 2 * (n - 1);
                let m = i.rem_euclid(period);
                let reflected = if m >= n { period - m } else { m };
                Some(reflected as usize)
            }
        }
    }
}

/// Random-access voxel data of one view.
///
/// Implementations may block on I/O; they are called concurrently from many
/// worker threads and must not serialize unrelated reads.
pub trait PixelSource: Send + Sync + fmt::Debug {
    fn dims(&self) -> [usize; 3];

    /// Read `region` (view-local voxel coordinates) converted to the working type.
    ///
    /// `out` is already sized to `region.size()`. Voxels outside the image are
    /// filled according to `extension`.
    fn read(
        &self,
        region: &Interval,
        extension: Extension,
        out: &mut Buffer3<f32>,
    ) -> Result<(), ExternalError>;
}

/// Fill `out` with `sample(x, y, z)` over `region`, applying `extension` outside `dims`.
///
/// Helper for [`PixelSource`] implementations backed by random access.
pub fn fill_region<F>(
    dims: [usize; 3],
    region: &Interval,
    extension: Extension,
    out: &mut Buffer3<f32>,
    sample: F,
) where
    F: Fn(usize, usize, usize) -> f32,
{
    assert_eq!(out.dims(), region.size(), "output buffer must match region size");

    let size = region.size();
    let origin = region.min();
    let axis_map = |axis: usize| -> Vec<Option<usize>> {
        (0..size[axis])
            .map(|i| extension.resolve(origin[axis] + i as i64, dims[axis]))
            .collect()
    };
    let xs = axis_map(0);
    let ys = axis_map(1);
    let zs = axis_map(2);

    for (z, sz) in zs.iter().enumerate() {
        for (y, sy) in ys.iter().enumerate() {
            let row = out.row_mut(y, z);
            match (sy, sz) {
                (Some(sy), Some(sz)) => {
                    for (value, sx) in row.iter_mut().zip(&xs) {
                        *value = sx.map_or(0.0, |sx| sample(sx, *sy, *sz));
                    }
                }
                _ => row.fill(0.0),
            }
        }
    }
}

/// In-memory view data in its native sample type.
#[derive(Debug, Clone)]
pub struct ArrayPixelSource<T: Sample> {
    voxels: Buffer3<T>,
}

impl<T: Sample> ArrayPixelSource<T> {
    pub fn new(voxels: Buffer3<T>) -> Self {
        Self { voxels }
    }

    pub fn from_vec(dims: [usize; 3], voxels: Vec<T>) -> Self {
        Self::new(Buffer3::new(dims, voxels))
    }

    /// Evaluate `f(x, y, z)` once per voxel.
    pub fn from_fn<F>(dims: [usize; 3], f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> T,
    {
        let mut voxels = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    voxels.push(f(x, y, z));
                }
            }
        }
        Self::from_vec(dims, voxels)
    }

    pub fn voxels(&self) -> &Buffer3<T> {
        &self.voxels
    }
}

impl<T: Sample> PixelSource for ArrayPixelSource<T> {
    fn dims(&self) -> [usize; 3] {
        self.voxels.dims()
    }

    fn read(
        &self,
        region: &Interval,
        extension: Extension,
        out: &mut Buffer3<f32>,
    ) -> Result<(), ExternalError> {
        fill_region(self.dims(), region, extension, out, |x, y, z| {
            self.voxels[(x, y, z)].to_working()
        });
        Ok(())
    }
}

/// Procedural view data, evaluated on demand. Never materializes the volume.
pub struct FnPixelSource<F> {
    dims: [usize; 3],
    f: F,
}

impl<F> FnPixelSource<F>
where
    F: Fn(usize, usize, usize) -> f32 + Send + Sync,
{
    pub fn new(dims: [usize; 3], f: F) -> Self {
        Self { dims, f }
    }
}

impl<F> fmt::Debug for FnPixelSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPixelSource")
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl<F> PixelSource for FnPixelSource<F>
where
    F: Fn(usize, usize, usize) -> f32 + Send + Sync,
{
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn read(
        &self,
        region: &Interval,
        extension: Extension,
        out: &mut Buffer3<f32>,
    ) -> Result<(), ExternalError> {
        fill_region(self.dims, region, extension, out, &self.f);
        Ok(())
    }
}
