//! Block-local -> view-local coordinate mappings.

use glam::{DAffine3, DVec3};

use crate::math::{Interval, transformed_bounds};
use crate::spline::NonRigidTransform;

/// Where each voxel of one block lands in one view's local voxel grid.
#[derive(Debug, Clone)]
pub enum BlockMapping {
    /// Block-local index -> view-local coordinate, rebasing translation folded in.
    Affine(DAffine3),
    /// Spline evaluated on a coarse lattice and interpolated in between.
    Lattice(Lattice),
}

impl BlockMapping {
    /// Concatenate the block origin translation with the view's inverse registration.
    pub fn affine(world_to_local: &DAffine3, block: &Interval) -> Self {
        BlockMapping::Affine(*world_to_local * DAffine3::from_translation(block.min().as_dvec3()))
    }

    pub fn lattice(transform: &NonRigidTransform, block: &Interval, spacing: usize) -> Self {
        BlockMapping::Lattice(Lattice::new(transform, block, spacing))
    }

    /// View-local coordinate of block voxel `(x, y, z)`.
    #[inline]
    pub fn local_at(&self, x: usize, y: usize, z: usize) -> DVec3 {
        match self {
            BlockMapping::Affine(m) => m.transform_point3(DVec3::new(x as f64, y as f64, z as f64)),
            BlockMapping::Lattice(lattice) => lattice.local_at(x, y, z),
        }
    }

    /// Real-valued bounds of every mapped voxel of a `block_dims` block.
    pub fn local_bounds(&self, block_dims: [usize; 3]) -> (DVec3, DVec3) {
        match self {
            BlockMapping::Affine(m) => transformed_bounds(m, &Interval::from_dims(block_dims)),
            BlockMapping::Lattice(lattice) => lattice.bounds(),
        }
    }

    /// Smallest part of the view needed to sample every voxel of the block.
    ///
    /// `None` when the block maps entirely outside the view.
    pub fn source_window(&self, block_dims: [usize; 3], view_dims: [usize; 3]) -> Option<Interval> {
        let (lo, hi) = self.local_bounds(block_dims);
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        Interval::enclosing(lo, hi).intersect(&Interval::from_dims(view_dims))
    }
}

/// Spline-mapped coordinates at lattice nodes of one block.
///
/// Nodes sit every `spacing` voxels along each axis, plus the last voxel.
/// Values between nodes are trilinear combinations, so the node bounding box
/// contains every interpolated coordinate.
#[derive(Debug, Clone)]
pub struct Lattice {
    nodes: [Vec<usize>; 3],
    values: Vec<DVec3>,
}

impl Lattice {
    pub fn new(transform: &NonRigidTransform, block: &Interval, spacing: usize) -> Self {
        let size = block.size();
        let nodes: [Vec<usize>; 3] = std::array::from_fn(|d| axis_nodes(size[d], spacing.max(1)));
        let origin = block.min().as_dvec3();

        let mut values = Vec::with_capacity(nodes[0].len() * nodes[1].len() * nodes[2].len());
        for &z in &nodes[2] {
            for &y in &nodes[1] {
                for &x in &nodes[0] {
                    let world = origin + DVec3::new(x as f64, y as f64, z as f64);
                    values.push(transform.to_local(world));
                }
            }
        }

        Self { nodes, values }
    }

    #[inline]
    fn node(&self, i: usize, j: usize, k: usize) -> DVec3 {
        let nx = self.nodes[0].len();
        let ny = self.nodes[1].len();
        self.values[(k * ny + j) * nx + i]
    }

    pub fn local_at(&self, x: usize, y: usize, z: usize) -> DVec3 {
        let (i0, i1, tx) = axis_cell(&self.nodes[0], x);
        let (j0, j1, ty) = axis_cell(&self.nodes[1], y);
        let (k0, k1, tz) = axis_cell(&self.nodes[2], z);

        let lerp = |a: DVec3, b: DVec3, t: f64| a + (b - a) * t;
        let c00 = lerp(self.node(i0, j0, k0), self.node(i1, j0, k0), tx);
        let c10 = lerp(self.node(i0, j1, k0), self.node(i1, j1, k0), tx);
        let c01 = lerp(self.node(i0, j0, k1), self.node(i1, j0, k1), tx);
        let c11 = lerp(self.node(i0, j1, k1), self.node(i1, j1, k1), tx);
        let c0 = lerp(c00, c10, ty);
        let c1 = lerp(c01, c11, ty);
        lerp(c0, c1, tz)
    }

    pub fn bounds(&self) -> (DVec3, DVec3) {
        self.values.iter().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        )
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len()
    }
}

/// Node coordinates `0, s, 2s, ...` along an axis of `n` voxels, ending at `n - 1`.
fn axis_nodes(n: usize, spacing: usize) -> Vec<usize> {
    if n == 0 {
        return vec![0];
    }
    let mut nodes: Vec<usize> = (0..n).step_by(spacing).collect();
    if nodes.last() != Some(&(n - 1)) {
        nodes.push(n - 1);
    }
    nodes
}

/// Lattice cell containing `x`: lower node, upper node, fraction.
#[inline]
fn axis_cell(nodes: &[usize], x: usize) -> (usize, usize, f64) {
    if nodes.len() < 2 {
        return (0, 0, 0.0);
    }
    let spacing = nodes[1] - nodes[0];
    let i = (x / spacing).min(nodes.len() - 2);
    let (a, b) = (nodes[i], nodes[i + 1]);
    let t = ((x.saturating_sub(a)) as f64 / (b - a) as f64).min(1.0);
    (i, i + 1, t)
}
