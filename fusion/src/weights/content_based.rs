//! Content-based (local contrast) weights.
//!
//! `diff = (I - G(σ1) * I)²`, `weight = (G(σ2) * diff) / scale`. Both passes
//! need their kernel radius of context, so the source is read over the
//! requested window grown by `r1 + r2` with mirrored extension at the image
//! faces, and the result is cropped back to the window.

use common::Buffer3;
use glam::I64Vec3;

use super::gaussian::{gaussian_blur, kernel_radius};
use crate::config::ContentBasedParams;
use crate::error::Error;
use crate::math::Interval;
use crate::view::{Extension, PixelSource, ViewId};

/// Local-contrast weight generator. Outputs are non-negative and unclamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBased {
    params: ContentBasedParams,
    margin: I64Vec3,
}

/// Per-thread buffers reused across blocks. Contents never outlive one call.
#[derive(Debug, Default)]
pub struct ContentScratch {
    padded: Buffer3<f32>,
    blurred: Buffer3<f32>,
    tmp: Buffer3<f32>,
}

impl ContentBased {
    pub fn new(params: ContentBasedParams) -> Self {
        let margin = I64Vec3::from_array(std::array::from_fn(|d| {
            (kernel_radius(params.sigma1[d]) + kernel_radius(params.sigma2[d])) as i64
        }));
        Self { params, margin }
    }

    #[inline]
    pub fn params(&self) -> &ContentBasedParams {
        &self.params
    }

    /// Extra context read on each side of a window.
    #[inline]
    pub fn margin(&self) -> I64Vec3 {
        self.margin
    }

    /// Compute weights over `window` (view-local voxels) into `out`.
    ///
    /// `out` is resized to the window.
    pub fn compute(
        &self,
        view: ViewId,
        source: &dyn PixelSource,
        window: &Interval,
        scratch: &mut ContentScratch,
        out: &mut Buffer3<f32>,
    ) -> Result<(), Error> {
        let padded_region = window.expand(self.margin);
        let padded_dims = padded_region.size();
        let len = padded_region.num_elements();

        for buffer in [&mut scratch.padded, &mut scratch.blurred, &mut scratch.tmp] {
            buffer
                .try_reset(padded_dims, 0.0)
                .map_err(|e| Error::exhausted::<f32>("content-based scratch", len, e))?;
        }
        out.try_reset(window.size(), 0.0).map_err(|e| {
            Error::exhausted::<f32>("content-based weights", window.num_elements(), e)
        })?;

        source
            .read(&padded_region, Extension::Mirror, &mut scratch.padded)
            .map_err(|source| Error::SourceRead { view, source })?;

        scratch.blurred.copy_from_slice(&scratch.padded);
        gaussian_blur(&mut scratch.blurred, &mut scratch.tmp, self.params.sigma1);

        for (v, b) in scratch.padded.iter_mut().zip(scratch.blurred.iter()) {
            let detail = *v - *b;
            *v = detail * detail;
        }
        gaussian_blur(&mut scratch.padded, &mut scratch.tmp, self.params.sigma2);

        let inv_scale = 1.0 / self.params.scale;
        let [mx, my, mz] = self.margin.to_array().map(|m| m as usize);
        let [width, height, depth] = out.dims();
        for z in 0..depth {
            for y in 0..height {
                let src = &scratch.padded.row(y + my, z + mz)[mx..mx + width];
                for (dst, &s) in out.row_mut(y, z).iter_mut().zip(src) {
                    *dst = s * inv_scale;
                }
            }
        }

        Ok(())
    }
}
