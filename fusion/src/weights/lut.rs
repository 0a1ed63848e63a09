//! Cosine blending ramp lookup table.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// Number of linear segments covering `[0, 1]`.
const RAMP_LUT_RESOLUTION: usize = 1000;

/// Ramp value computed directly: 0 at `x = 0`, 1 at `x = 1`, flat at both ends.
#[inline]
pub(crate) fn cosine_ramp_direct(x: f64) -> f64 {
    ((1.0 - x) * PI).cos() * 0.5 + 0.5
}

#[derive(Debug)]
struct RampLut {
    values: Vec<f32>,
}

impl RampLut {
    fn new() -> Self {
        let values = (0..=RAMP_LUT_RESOLUTION)
            .map(|i| cosine_ramp_direct(i as f64 / RAMP_LUT_RESOLUTION as f64) as f32)
            .collect();
        Self { values }
    }

    /// Linear interpolation between the two nearest table entries.
    #[inline]
    fn lookup(&self, x: f64) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let pos = x * RAMP_LUT_RESOLUTION as f64;
        let i = (pos as usize).min(RAMP_LUT_RESOLUTION - 1);
        let t = (pos - i as f64) as f32;
        let a = self.values[i];
        let b = self.values[i + 1];
        a + t * (b - a)
    }
}

static RAMP_LUT: OnceLock<RampLut> = OnceLock::new();

/// Cosine ramp `(cos((1 - x)π) + 1) / 2`, clamped to `[0, 1]` outside the unit interval.
#[inline]
pub fn cosine_ramp(x: f64) -> f32 {
    RAMP_LUT.get_or_init(RampLut::new).lookup(x)
}
