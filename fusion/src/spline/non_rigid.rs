use glam::{DAffine3, DMat3, DVec3};

use super::{ThinPlateSpline, TpsConfig};
use crate::error::ConfigError;

/// Lattice nodes per axis sampled when bounding a view in world space.
const BOUNDS_LATTICE_NODES: usize = 17;

/// Newton iterations allowed when inverting the spline.
const INVERSE_MAX_ITERATIONS: usize = 50;

/// Accepted residual of an inverted point, in local voxels.
const INVERSE_TOLERANCE: f64 = 1e-6;

/// Central-difference step for the spline Jacobian, in world units.
const JACOBIAN_STEP: f64 = 1e-3;

/// Registration of a view refined by a thin-plate spline.
///
/// The spline maps world coordinates back to view-local coordinates, which is
/// the direction resampling needs. The affine registration seeds the inverse
/// mapping used for world bounds.
#[derive(Debug, Clone)]
pub struct NonRigidTransform {
    registration: DAffine3,
    world_to_local: ThinPlateSpline,
    max_deviation: f64,
}

impl NonRigidTransform {
    /// Fit a spline through corresponding `local_points` (view voxels) and
    /// `world_points` (output space).
    ///
    /// Needs at least 4 non-coplanar correspondences.
    pub fn fit(
        registration: DAffine3,
        local_points: &[DVec3],
        world_points: &[DVec3],
        config: &TpsConfig,
    ) -> Result<Self, ConfigError> {
        if local_points.len() != world_points.len() {
            return Err(ConfigError::NonRigidFit {
                reason: format!(
                    "{} local points but {} world points",
                    local_points.len(),
                    world_points.len()
                ),
            });
        }
        if local_points.len() < 4 {
            return Err(ConfigError::NonRigidFit {
                reason: format!(
                    "need at least 4 control points, got {}",
                    local_points.len()
                ),
            });
        }
        if !config.regularization.is_finite() || config.regularization < 0.0 {
            return Err(ConfigError::NonRigidFit {
                reason: format!("invalid regularization {}", config.regularization),
            });
        }

        let world_to_local = ThinPlateSpline::fit(world_points, local_points, config).ok_or_else(
            || ConfigError::NonRigidFit {
                reason: "control points are degenerate (coplanar or duplicated)".to_string(),
            },
        )?;

        // How far the true world position strays from the affine prediction.
        let max_deviation = local_points
            .iter()
            .zip(world_points)
            .map(|(&local, &world)| registration.transform_point3(local).distance(world))
            .fold(0.0, f64::max);

        Ok(Self {
            registration,
            world_to_local,
            max_deviation,
        })
    }

    #[inline]
    pub fn registration(&self) -> &DAffine3 {
        &self.registration
    }

    /// Largest distance between a control point's world position and its affine prediction.
    #[inline]
    pub fn max_deviation(&self) -> f64 {
        self.max_deviation
    }

    pub fn spline(&self) -> &ThinPlateSpline {
        &self.world_to_local
    }

    /// Map a world position to view-local voxel coordinates.
    #[inline]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.world_to_local.transform(world)
    }

    /// World position the spline maps onto `local`.
    ///
    /// Newton iteration seeded with the affine prediction; `None` if it does
    /// not converge.
    pub fn to_world(&self, local: DVec3) -> Option<DVec3> {
        let mut world = self.registration.transform_point3(local);
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let residual = local - self.to_local(world);
            if !residual.is_finite() {
                return None;
            }
            if residual.length() < INVERSE_TOLERANCE {
                return Some(world);
            }
            let jacobian = self.jacobian(world);
            let det = jacobian.determinant();
            if !det.is_finite() || det.abs() < f64::EPSILON {
                return None;
            }
            world += jacobian.inverse() * residual;
        }
        None
    }

    /// Derivative of [`Self::to_local`] at `world`, one column per world axis.
    fn jacobian(&self, world: DVec3) -> DMat3 {
        let column = |axis: DVec3| {
            let step = axis * JACOBIAN_STEP;
            (self.to_local(world + step) - self.to_local(world - step)) / (2.0 * JACOBIAN_STEP)
        };
        DMat3::from_cols(column(DVec3::X), column(DVec3::Y), column(DVec3::Z))
    }

    /// Real-valued world bounds of the voxel centers of a `dims`-sized view.
    ///
    /// Inverts the spline on a lattice spanning the view and grows the box of
    /// the results by the longest world-space lattice edge, which covers the
    /// positions between lattice nodes.
    pub fn world_bounds(&self, dims: [usize; 3]) -> Result<(DVec3, DVec3), ConfigError> {
        let nodes = dims.map(|d| d.clamp(1, BOUNDS_LATTICE_NODES));
        let coordinate = |axis: usize, i: usize| {
            if nodes[axis] == 1 {
                0.0
            } else {
                (dims[axis] - 1) as f64 * i as f64 / (nodes[axis] - 1) as f64
            }
        };

        let [nx, ny, nz] = nodes;
        let mut lattice = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let local = DVec3::new(coordinate(0, i), coordinate(1, j), coordinate(2, k));
                    let world = self.to_world(local).ok_or_else(|| ConfigError::NonRigidFit {
                        reason: format!("spline cannot be inverted at local {local}"),
                    })?;
                    lattice.push(world);
                }
            }
        }

        let at = |i: usize, j: usize, k: usize| lattice[(k * ny + j) * nx + i];
        let mut lo = DVec3::splat(f64::INFINITY);
        let mut hi = DVec3::splat(f64::NEG_INFINITY);
        let mut edge = 0.0f64;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let p = at(i, j, k);
                    lo = lo.min(p);
                    hi = hi.max(p);
                    if i + 1 < nx {
                        edge = edge.max(p.distance(at(i + 1, j, k)));
                    }
                    if j + 1 < ny {
                        edge = edge.max(p.distance(at(i, j + 1, k)));
                    }
                    if k + 1 < nz {
                        edge = edge.max(p.distance(at(i, j, k + 1)));
                    }
                }
            }
        }

        let slack = DVec3::splat(edge);
        Ok((lo - slack, hi + slack))
    }
}
