//! Separable 3D Gaussian convolution on dense buffers.

use common::Buffer3;

/// Compute 1D Gaussian kernel.
///
/// The kernel is normalized so that it sums to 1.0.
/// Kernel radius is chosen as ceil(3 * sigma) to capture 99.7% of the Gaussian.
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f32> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = kernel_radius(sigma);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    kernel.into_iter().map(|v| v as f32).collect()
}

/// Support radius of a Gaussian kernel in voxels.
#[inline]
pub fn kernel_radius(sigma: f64) -> usize {
    (3.0 * sigma).ceil() as usize
}

/// Blur `buffer` in place with per-axis sigmas.
///
/// `scratch` is resized to match. Voxels near the buffer faces see the edge
/// value repeated, so callers that need exact results pad the input by the
/// kernel radius and crop afterwards.
pub fn gaussian_blur(buffer: &mut Buffer3<f32>, scratch: &mut Buffer3<f32>, sigma: [f64; 3]) {
    debug_assert_eq!(buffer.dims(), scratch.dims(), "scratch must match buffer size");

    for (axis, &s) in sigma.iter().enumerate() {
        let kernel = gaussian_kernel_1d(s);
        convolve_axis(buffer, scratch, axis, &kernel);
        std::mem::swap(buffer, scratch);
    }
}

/// Convolve `input` along `axis` into `output`, clamping indices at the faces.
fn convolve_axis(input: &Buffer3<f32>, output: &mut Buffer3<f32>, axis: usize, kernel: &[f32]) {
    let [w, h, d] = input.dims();
    let radius = (kernel.len() / 2) as isize;
    let n = input.dims()[axis] as isize;

    // (stride along axis, then count and stride of the two other axes)
    let (stride, a_len, a_stride, b_len, b_stride) = match axis {
        0 => (1, h, w, d, w * h),
        1 => (w, w, 1, d, w * h),
        _ => (w * h, w, 1, h, w),
    };

    let src = input.voxels();
    let dst = output.voxels_mut();

    for b in 0..b_len {
        for a in 0..a_len {
            let base = a * a_stride + b * b_stride;
            for i in 0..n {
                let mut sum = 0.0f32;
                for (k, &kval) in kernel.iter().enumerate() {
                    let j = (i + k as isize - radius).clamp(0, n - 1) as usize;
                    sum += src[base + j * stride] * kval;
                }
                dst[base + i as usize * stride] = sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel_1d(2.0);
        assert_eq!(kernel.len(), 13);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..6 {
            assert_eq!(kernel[i], kernel[12 - i]);
        }
        assert!(kernel[6] > kernel[5]);
    }

    #[test]
    fn test_fractional_sigma_radius_rounds_up() {
        assert_eq!(kernel_radius(0.4), 2);
        assert_eq!(kernel_radius(20.0), 60);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let mut buffer = Buffer3::new_filled([7, 5, 4], 3.0f32);
        let mut scratch = Buffer3::new_default([7, 5, 4]);
        gaussian_blur(&mut buffer, &mut scratch, [1.0, 1.5, 0.7]);
        for &v in buffer.voxels() {
            assert!((v - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_blur_spreads_impulse_per_axis() {
        let mut buffer = Buffer3::new_default([9, 9, 9]);
        buffer[(4, 4, 4)] = 1.0f32;
        let mut scratch = Buffer3::new_default([9, 9, 9]);
        gaussian_blur(&mut buffer, &mut scratch, [1.0, 1.0, 1.0]);

        let total: f32 = buffer.voxels().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(buffer[(4, 4, 4)] > buffer[(5, 4, 4)]);
        assert!((buffer[(5, 4, 4)] - buffer[(4, 5, 4)]).abs() < 1e-7);
        assert!((buffer[(4, 4, 3)] - buffer[(4, 4, 5)]).abs() < 1e-7);
    }
}
