use super::lut::cosine_ramp;
use super::separable::{AxisProfile, SeparableWeight};
use crate::config::BlendingParams;

/// Cosine-ramped weight falling to zero towards the faces of a view.
///
/// Values lie in `[0, 1]`; the weight is continuous and non-decreasing from
/// the border inward on every axis. Ramps always span `blend` voxels, so a
/// collapsed profile peaks below 1 at its midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Blending {
    axes: [AxisProfile; 3],
    blend: [f64; 3],
}

impl Blending {
    pub fn new(dims: [usize; 3], params: &BlendingParams) -> Self {
        Self {
            axes: std::array::from_fn(|d| {
                AxisProfile::new(dims[d], params.border[d], params.blend[d])
            }),
            blend: params.blend,
        }
    }
}

impl SeparableWeight for Blending {
    #[inline]
    fn profile(&self, axis: usize) -> &AxisProfile {
        &self.axes[axis]
    }

    #[inline]
    fn axis_weight(&self, axis: usize, l: f64) -> f32 {
        let p = &self.axes[axis];
        let blend = self.blend[axis];
        if l < p.b0 || l > p.b3 {
            0.0
        } else if blend <= 0.0 {
            1.0
        } else if l <= p.b1 {
            cosine_ramp((l - p.b0) / blend)
        } else if l >= p.b2 {
            cosine_ramp((p.b3 - l) / blend)
        } else {
            1.0
        }
    }
}
