//! Dense 3D buffer with x as the fastest axis, then y, then z.

use std::collections::TryReserveError;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer3<T> {
    voxels: Vec<T>,
    width: usize,
    height: usize,
    depth: usize,
}

impl<T> Buffer3<T> {
    pub fn new(dims: [usize; 3], voxels: Vec<T>) -> Self {
        assert_eq!(
            voxels.len(),
            dims[0] * dims[1] * dims[2],
            "voxels length must equal width * height * depth"
        );
        Self {
            voxels,
            width: dims[0],
            height: dims[1],
            depth: dims[2],
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &T {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        &self.voxels[self.index(x, y, z)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        let idx = self.index(x, y, z);
        &mut self.voxels[idx]
    }

    /// One scanline along x at `(y, z)`.
    #[inline]
    pub fn row(&self, y: usize, z: usize) -> &[T] {
        let start = self.index(0, y, z);
        &self.voxels[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize, z: usize) -> &mut [T] {
        let start = self.index(0, y, z);
        let width = self.width;
        &mut self.voxels[start..start + width]
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    #[inline]
    pub fn voxels(&self) -> &[T] {
        &self.voxels
    }

    #[inline]
    pub fn voxels_mut(&mut self) -> &mut [T] {
        &mut self.voxels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.voxels
    }
}

impl<T: Clone> Buffer3<T> {
    pub fn new_filled(dims: [usize; 3], value: T) -> Self {
        Self {
            voxels: vec![value; dims[0] * dims[1] * dims[2]],
            width: dims[0],
            height: dims[1],
            depth: dims[2],
        }
    }

    /// Like [`Buffer3::new_filled`] but reports allocation failure instead of aborting.
    pub fn try_new_filled(dims: [usize; 3], value: T) -> Result<Self, TryReserveError> {
        let mut buffer = Self {
            voxels: Vec::new(),
            width: 0,
            height: 0,
            depth: 0,
        };
        buffer.try_reset(dims, value)?;
        Ok(buffer)
    }

    /// Reshape to `dims` and fill with `value`, reusing the existing allocation when it is
    /// large enough.
    ///
    /// On failure the buffer is left empty with dimensions `[0, 0, 0]`.
    pub fn try_reset(&mut self, dims: [usize; 3], value: T) -> Result<(), TryReserveError> {
        let len = dims[0] * dims[1] * dims[2];
        self.voxels.clear();
        self.width = 0;
        self.height = 0;
        self.depth = 0;
        self.voxels.try_reserve_exact(len)?;
        self.voxels.resize(len, value);
        self.width = dims[0];
        self.height = dims[1];
        self.depth = dims[2];
        Ok(())
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.voxels.fill(value);
    }
}

impl<T> Default for Buffer3<T> {
    /// Empty `[0, 0, 0]` buffer without an allocation.
    fn default() -> Self {
        Self {
            voxels: Vec::new(),
            width: 0,
            height: 0,
            depth: 0,
        }
    }
}

impl<T: Default + Clone> Buffer3<T> {
    pub fn new_default(dims: [usize; 3]) -> Self {
        Self::new_filled(dims, T::default())
    }
}

impl<T> Index<(usize, usize, usize)> for Buffer3<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y, z): (usize, usize, usize)) -> &Self::Output {
        &self.voxels[(z * self.height + y) * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Buffer3<T> {
    #[inline]
    fn index_mut(&mut self, (x, y, z): (usize, usize, usize)) -> &mut Self::Output {
        &mut self.voxels[(z * self.height + y) * self.width + x]
    }
}

impl<T> Deref for Buffer3<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.voxels
    }
}

impl<T> DerefMut for Buffer3<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.voxels
    }
}

impl<'a, T> IntoIterator for &'a Buffer3<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.voxels.iter()
    }
}

impl<T> From<Buffer3<T>> for Vec<T> {
    #[inline]
    fn from(buffer: Buffer3<T>) -> Self {
        buffer.voxels
    }
}
