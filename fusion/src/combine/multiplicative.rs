use common::Buffer3;

/// Elementwise product of two weight blocks, e.g. blending × content-based.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiplicative;

impl Multiplicative {
    /// New block holding `a · b`.
    pub fn combine(a: &Buffer3<f32>, b: &Buffer3<f32>) -> Buffer3<f32> {
        let mut out = a.clone();
        multiply_weights(&mut out, b);
        out
    }
}

/// `weights *= other`, elementwise.
pub fn multiply_weights(weights: &mut Buffer3<f32>, other: &Buffer3<f32>) {
    assert_eq!(weights.dims(), other.dims(), "weight blocks must have equal size");
    for (w, &o) in weights.iter_mut().zip(other.iter()) {
        *w *= o;
    }
}
