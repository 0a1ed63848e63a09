//! Views: one source volume plus its registration into the output space.

mod source;


pub use source::{
    ArrayPixelSource, Extension, FnPixelSource, PixelSource, Sample, fill_region,
};

use std::fmt;
use std::sync::Arc;

use glam::{DAffine3, DVec3};

use crate::error::ConfigError;
use crate::math::{Interval, transformed_bounds};
use crate::spline::NonRigidTransform;

/// Stable identity of a view within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view {}", self.0)
    }
}

/// Registration of a view: maps view-local voxel coordinates into world coordinates.
#[derive(Debug, Clone)]
pub enum ViewTransform {
    Affine(DAffine3),
    /// Affine registration refined by a thin-plate spline.
    NonRigid(Arc<NonRigidTransform>),
}

impl ViewTransform {
    /// The affine part of the registration.
    pub fn registration(&self) -> &DAffine3 {
        match self {
            ViewTransform::Affine(affine) => affine,
            ViewTransform::NonRigid(non_rigid) => non_rigid.registration(),
        }
    }

    /// Real-valued world bounds of the voxel centers of a `dims`-sized view.
    ///
    /// Non-rigid views are bounded through their spline, which fails only if
    /// it cannot be inverted over the view.
    pub fn world_bounds(&self, dims: [usize; 3]) -> Result<(DVec3, DVec3), ConfigError> {
        match self {
            ViewTransform::Affine(affine) => {
                Ok(transformed_bounds(affine, &Interval::from_dims(dims)))
            }
            ViewTransform::NonRigid(non_rigid) => non_rigid.world_bounds(dims),
        }
    }
}

/// One source volume of a fusion job. Immutable for the duration of the job.
///
/// The pixel source is shared, never owned exclusively: views are cheap to clone.
#[derive(Debug, Clone)]
pub struct View {
    id: ViewId,
    dims: [usize; 3],
    transform: ViewTransform,
    source: Arc<dyn PixelSource>,
}

impl View {
    pub fn new(id: ViewId, transform: ViewTransform, source: Arc<dyn PixelSource>) -> Self {
        Self {
            id,
            dims: source.dims(),
            transform,
            source,
        }
    }

    /// View registered by a plain affine transform.
    pub fn affine(id: ViewId, transform: DAffine3, source: Arc<dyn PixelSource>) -> Self {
        Self::new(id, ViewTransform::Affine(transform), source)
    }

    #[inline]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    #[inline]
    pub fn source(&self) -> &dyn PixelSource {
        self.source.as_ref()
    }

    /// `[0, dims)` in view-local voxel coordinates.
    #[inline]
    pub fn local_interval(&self) -> Interval {
        Interval::from_dims(self.dims)
    }
}
