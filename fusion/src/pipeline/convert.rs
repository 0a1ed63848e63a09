//! Conversion of fused working-type blocks to output sample types.

use common::Buffer3;

use crate::view::Sample;

/// How working values are mapped before rounding to the output type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputRange {
    /// Values are rounded and clamped as they are.
    #[default]
    Identity,
    /// `[min, max]` is mapped linearly onto `[0, T::MAX_VALUE]`.
    Linear { min: f32, max: f32 },
}

impl OutputRange {
    #[inline]
    pub fn apply<T: Sample>(&self, value: f32) -> T {
        match *self {
            OutputRange::Identity => T::from_working(value),
            OutputRange::Linear { min, max } => {
                let span = max - min;
                let scaled = if span > 0.0 {
                    (value - min) / span * T::MAX_VALUE
                } else {
                    0.0
                };
                T::from_working(scaled.clamp(0.0, T::MAX_VALUE))
            }
        }
    }
}

/// Convert a fused block to `T`.
pub fn convert_block<T: Sample>(block: &Buffer3<f32>, range: OutputRange) -> Buffer3<T> {
    let voxels = block.iter().map(|&v| range.apply::<T>(v)).collect();
    Buffer3::new(block.dims(), voxels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rounds_and_clamps() {
        let block = Buffer3::new([4, 1, 1], vec![-3.0, 1.4, 1.6, 300.0]);
        let out: Buffer3<u8> = convert_block(&block, OutputRange::Identity);
        assert_eq!(out.voxels(), &[0, 1, 2, 255]);
    }

    #[test]
    fn test_linear_range_to_u16() {
        let block = Buffer3::new([3, 1, 1], vec![100.0, 150.0, 200.0]);
        let range = OutputRange::Linear { min: 100.0, max: 200.0 };
        let out: Buffer3<u16> = convert_block(&block, range);
        assert_eq!(out.voxels(), &[0, 32768, 65535]);
    }

    #[test]
    fn test_linear_range_to_f32_normalizes() {
        let block = Buffer3::new([3, 1, 1], vec![-1.0, 0.0, 5.0]);
        let range = OutputRange::Linear { min: -1.0, max: 1.0 };
        let out: Buffer3<f32> = convert_block(&block, range);
        assert_eq!(out.voxels(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_degenerate_range_maps_to_zero() {
        let block = Buffer3::new([2, 1, 1], vec![3.0, 7.0]);
        let out: Buffer3<u8> = convert_block(&block, OutputRange::Linear { min: 5.0, max: 5.0 });
        assert_eq!(out.voxels(), &[0, 0]);
    }
}
