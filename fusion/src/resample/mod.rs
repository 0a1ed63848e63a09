//! Transform/resample stage: view samples -> output block coordinates.
//!
//! Per view and block: map block voxels into the view (affine or spline
//! lattice), derive the minimal source window from the mapped bounds, read
//! and convert that window to the working type, apply an optional intensity
//! adjustment, then interpolate.

mod interpolate;
mod mapping;


pub use interpolate::resample_block;
pub use mapping::{BlockMapping, Lattice};

use std::fmt;

use common::Buffer3;
use strum_macros::Display;

use crate::error::Error;
use crate::math::Interval;
use crate::view::{Extension, View, ViewId};

/// Per-pixel radiometric correction supplied by an external collaborator.
///
/// Applied to each view's converted source window before interpolation. Views
/// fused with an adjustment use [`ResamplePath::General`].
pub trait IntensityAdjustment: Send + Sync + fmt::Debug {
    /// Adjust `samples`, which cover `region` in `view`-local coordinates.
    fn adjust(&self, view: ViewId, region: &Interval, samples: &mut Buffer3<f32>);
}

/// How a view's samples are interpolated into a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ResamplePath {
    /// Affine scanline stepping with constant per-voxel increments.
    Incremental,
    /// Per-voxel mapping; handles non-rigid views and intensity adjustment.
    General,
}

/// Read `window` of `view` into `out` as working samples, then adjust.
///
/// `out` is resized to the window.
pub fn read_window(
    view: &View,
    window: &Interval,
    adjustment: Option<&dyn IntensityAdjustment>,
    out: &mut Buffer3<f32>,
) -> Result<(), Error> {
    out.try_reset(window.size(), 0.0)
        .map_err(|e| Error::exhausted::<f32>("source window", window.num_elements(), e))?;
    view.source()
        .read(window, Extension::Border, out)
        .map_err(|source| Error::SourceRead {
            view: view.id(),
            source,
        })?;
    if let Some(adjustment) = adjustment {
        adjustment.adjust(view.id(), window, out);
    }
    Ok(())
}
