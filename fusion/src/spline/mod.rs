//! Thin-plate spline (TPS) transforms for non-rigid fusion.
//!
//! Smooth RBF interpolation in 3D that minimizes bending energy:
//!
//! ```text
//! f(p) = a₀ + a₁x + a₂y + a₃z + Σᵢ wᵢ U(||p - pᵢ||)
//! ```
//!
//! where U(r) = r² log(r), evaluated independently for each output coordinate.

mod non_rigid;


pub use non_rigid::NonRigidTransform;

use glam::DVec3;

/// Configuration for thin-plate spline fitting.
#[derive(Debug, Clone, Default)]
pub struct TpsConfig {
    /// Regularization parameter (lambda). Higher values produce smoother
    /// interpolation but may not pass exactly through control points.
    /// Default: 0.0 (exact interpolation)
    pub regularization: f64,
}

/// Thin-plate spline mapping 3D points to 3D points.
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    control_points: Vec<DVec3>,
    /// RBF weight per control point, one component per output axis.
    weights: Vec<DVec3>,
    /// Affine part: `affine[0] + affine[1]·x + affine[2]·y + affine[3]·z`.
    affine: [DVec3; 4],
}

impl ThinPlateSpline {
    /// Fit a spline through `source_points -> target_points`.
    ///
    /// Returns `None` with fewer than 4 points, mismatched lengths, or a
    /// singular system (e.g. coplanar control points).
    pub fn fit(
        source_points: &[DVec3],
        target_points: &[DVec3],
        config: &TpsConfig,
    ) -> Option<Self> {
        let n = source_points.len();
        if n < 4 || n != target_points.len() {
            return None;
        }

        // [K + λI  P] [w]   [v]
        // [P^T     0] [a] = [0]
        //
        // K[i,j] = U(||p_i - p_j||), P[i,:] = [1, x_i, y_i, z_i]
        let size = n + 4;
        let mut matrix = vec![vec![0.0; size]; size];

        for i in 0..n {
            for j in 0..n {
                matrix[i][j] = if i == j {
                    config.regularization
                } else {
                    tps_kernel(source_points[i].distance(source_points[j]))
                };
            }
        }

        for (i, p) in source_points.iter().enumerate() {
            let row = [1.0, p.x, p.y, p.z];
            for (k, &v) in row.iter().enumerate() {
                matrix[i][n + k] = v;
                matrix[n + k][i] = v;
            }
        }

        let mut rhs = vec![[0.0; 3]; size];
        for (i, t) in target_points.iter().enumerate() {
            rhs[i] = [t.x, t.y, t.z];
        }

        let solution = solve_linear_system(matrix, rhs)?;
        let as_vec = |s: &[f64; 3]| DVec3::new(s[0], s[1], s[2]);

        Some(Self {
            control_points: source_points.to_vec(),
            weights: solution[..n].iter().map(as_vec).collect(),
            affine: [
                as_vec(&solution[n]),
                as_vec(&solution[n + 1]),
                as_vec(&solution[n + 2]),
                as_vec(&solution[n + 3]),
            ],
        })
    }

    /// Map a point through the fitted spline.
    pub fn transform(&self, p: DVec3) -> DVec3 {
        let mut t =
            self.affine[0] + self.affine[1] * p.x + self.affine[2] * p.y + self.affine[3] * p.z;
        for (&cp, &w) in self.control_points.iter().zip(&self.weights) {
            t += w * tps_kernel(p.distance(cp));
        }
        t
    }

    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    pub fn control_points(&self) -> &[DVec3] {
        &self.control_points
    }

    /// Distance between the mapped control points and `target_points`.
    pub fn compute_residuals(&self, target_points: &[DVec3]) -> Vec<f64> {
        self.control_points
            .iter()
            .zip(target_points)
            .map(|(&src, &tgt)| self.transform(src).distance(tgt))
            .collect()
    }
}

/// TPS radial basis function: U(r) = r² log(r), with U(0) = 0.
#[inline]
pub(crate) fn tps_kernel(r: f64) -> f64 {
    if r < 1e-10 { 0.0 } else { r * r * r.ln() }
}

/// Solve `A x = b` for three right-hand sides by Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<[f64; 3]>) -> Option<Vec<[f64; 3]>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..n {
            let val = a[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < 1e-12 {
            return None;
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            for k in 0..3 {
                b[row][k] -= factor * b[col][k];
            }
        }
    }

    let mut x = vec![[0.0; 3]; n];
    for i in (0..n).rev() {
        for k in 0..3 {
            let mut v = b[i][k];
            for j in (i + 1)..n {
                v -= a[i][j] * x[j][k];
            }
            x[i][k] = v / a[i][i];
        }
    }

    Some(x)
}
