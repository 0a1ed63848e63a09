//! Sampling a source window at mapped block positions.

use common::Buffer3;
use glam::{DAffine3, DVec3};

use super::mapping::BlockMapping;
use super::ResamplePath;
use crate::config::Interpolation;

/// Nearest voxel, coordinates clamped into the window.
#[inline]
pub(crate) fn sample_nearest(data: &Buffer3<f32>, pos: DVec3) -> f32 {
    let [w, h, d] = data.dims();
    let ix = pos.x.round().clamp(0.0, (w - 1) as f64) as usize;
    let iy = pos.y.round().clamp(0.0, (h - 1) as f64) as usize;
    let iz = pos.z.round().clamp(0.0, (d - 1) as f64) as usize;
    data[(ix, iy, iz)]
}

/// Trilinear interpolation, coordinates clamped into the window.
#[inline]
pub(crate) fn sample_linear(data: &Buffer3<f32>, pos: DVec3) -> f32 {
    let [w, h, d] = data.dims();
    let (x0, x1, fx) = linear_axis(pos.x, w);
    let (y0, y1, fy) = linear_axis(pos.y, h);
    let (z0, z1, fz) = linear_axis(pos.z, d);

    let p000 = data[(x0, y0, z0)];
    let p100 = data[(x1, y0, z0)];
    let p010 = data[(x0, y1, z0)];
    let p110 = data[(x1, y1, z0)];
    let p001 = data[(x0, y0, z1)];
    let p101 = data[(x1, y0, z1)];
    let p011 = data[(x0, y1, z1)];
    let p111 = data[(x1, y1, z1)];

    let c00 = p000 + fx * (p100 - p000);
    let c10 = p010 + fx * (p110 - p010);
    let c01 = p001 + fx * (p101 - p001);
    let c11 = p011 + fx * (p111 - p011);
    let c0 = c00 + fy * (c10 - c00);
    let c1 = c01 + fy * (c11 - c01);
    c0 + fz * (c1 - c0)
}

#[inline]
fn linear_axis(p: f64, n: usize) -> (usize, usize, f32) {
    let last = (n - 1) as f64;
    let p = p.clamp(0.0, last);
    let i0 = p.floor();
    let i1 = (i0 + 1.0).min(last);
    (i0 as usize, i1 as usize, (p - i0) as f32)
}

#[inline]
fn sample(data: &Buffer3<f32>, pos: DVec3, interpolation: Interpolation) -> f32 {
    match interpolation {
        Interpolation::NearestNeighbor => sample_nearest(data, pos),
        Interpolation::Linear => sample_linear(data, pos),
    }
}

/// Resample `data` (covering view-local `window_min..`) into the block buffer `out`.
///
/// The incremental path only applies to affine mappings; lattice mappings are
/// always evaluated per voxel.
pub fn resample_block(
    data: &Buffer3<f32>,
    window_min: DVec3,
    mapping: &BlockMapping,
    path: ResamplePath,
    interpolation: Interpolation,
    out: &mut Buffer3<f32>,
) {
    match (path, mapping) {
        (ResamplePath::Incremental, BlockMapping::Affine(m)) => {
            resample_incremental(data, window_min, m, interpolation, out)
        }
        _ => resample_general(data, window_min, mapping, interpolation, out),
    }
}

/// Per-scanline stepping: the source position advances by the constant
/// x-axis derivative of the mapping.
fn resample_incremental(
    data: &Buffer3<f32>,
    window_min: DVec3,
    block_to_local: &DAffine3,
    interpolation: Interpolation,
    out: &mut Buffer3<f32>,
) {
    let [_, height, depth] = out.dims();
    let step = block_to_local.matrix3.x_axis;
    for z in 0..depth {
        for y in 0..height {
            let start =
                block_to_local.transform_point3(DVec3::new(0.0, y as f64, z as f64)) - window_min;
            for (x, value) in out.row_mut(y, z).iter_mut().enumerate() {
                *value = sample(data, start + step * x as f64, interpolation);
            }
        }
    }
}

fn resample_general(
    data: &Buffer3<f32>,
    window_min: DVec3,
    mapping: &BlockMapping,
    interpolation: Interpolation,
    out: &mut Buffer3<f32>,
) {
    let [_, height, depth] = out.dims();
    for z in 0..depth {
        for y in 0..height {
            for (x, value) in out.row_mut(y, z).iter_mut().enumerate() {
                let pos = mapping.local_at(x, y, z) - window_min;
                *value = sample(data, pos, interpolation);
            }
        }
    }
}
