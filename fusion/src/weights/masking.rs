use super::separable::{AxisProfile, SeparableWeight};

/// Binary visibility mask: 1 inside the view minus its border, 0 elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Masking {
    axes: [AxisProfile; 3],
}

impl Masking {
    pub fn new(dims: [usize; 3], border: [f64; 3]) -> Self {
        Self {
            axes: std::array::from_fn(|d| AxisProfile::new(dims[d], border[d], 0.0)),
        }
    }
}

impl SeparableWeight for Masking {
    #[inline]
    fn profile(&self, axis: usize) -> &AxisProfile {
        &self.axes[axis]
    }

    #[inline]
    fn axis_weight(&self, axis: usize, l: f64) -> f32 {
        let p = &self.axes[axis];
        if l < p.b0 || l > p.b3 { 0.0 } else { 1.0 }
    }
}
