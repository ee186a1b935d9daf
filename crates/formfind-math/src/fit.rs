//! Least-squares primitive fitting for regression-based constraints.
//!
//! Lines and planes come from the principal axes of the point covariance;
//! circles and spheres from the algebraic (Kåsa) fit, which is linear in
//! the unknowns and solved through its 3×3 / 4×4 normal equations.

use glam::{DVec2, DVec3};
use nalgebra::{Matrix3, Matrix4, SymmetricEigen, Vector3, Vector4};

use crate::decomposition::{outer, to_na3};

/// Principal axes of a point cloud, ordered by decreasing variance.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxes {
    /// Mean of the points.
    pub centroid: DVec3,
    /// Unit axes; `axes[0]` is the direction of largest spread and
    /// `axes[2]` is the best-fit plane normal.
    pub axes: [DVec3; 3],
    /// Variance along each axis.
    pub variances: [f64; 3],
}

/// Mean of a point set. Returns zero for an empty set.
pub fn centroid(points: &[DVec3]) -> DVec3 {
    if points.is_empty() {
        return DVec3::ZERO;
    }
    points.iter().copied().sum::<DVec3>() / points.len() as f64
}

/// Compute the principal axes of `points` from the eigenvectors of their
/// covariance matrix.
pub fn principal_axes(points: &[DVec3]) -> PrincipalAxes {
    let c = centroid(points);
    let mut cov = glam::DMat3::ZERO;
    for &p in points {
        let d = p - c;
        cov += outer(d, d);
    }

    let eigen = SymmetricEigen::new(to_na3(cov));
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let axis = |i: usize| {
        let col = eigen.eigenvectors.column(i);
        let v = DVec3::new(col[0], col[1], col[2]);
        v.try_normalize().unwrap_or(DVec3::X)
    };

    let mut axes = [axis(order[0]), axis(order[1]), axis(order[2])];
    // Keep a right-handed frame so in-plane coordinates are well oriented
    axes[2] = axes[0].cross(axes[1]).try_normalize().unwrap_or(axes[2]);

    PrincipalAxes {
        centroid: c,
        axes,
        variances: [
            eigen.eigenvalues[order[0]].max(0.0),
            eigen.eigenvalues[order[1]].max(0.0),
            eigen.eigenvalues[order[2]].max(0.0),
        ],
    }
}

/// Algebraic least-squares circle through 2D points.
///
/// Solves `x² + y² = 2a·x + 2b·y + c` for the centre (a, b) and
/// `r² = c + a² + b²`. Returns `None` for collinear or too few points.
pub fn fit_circle(points: &[DVec2]) -> Option<(DVec2, f64)> {
    if points.len() < 3 {
        return None;
    }

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for p in points {
        let row = Vector3::new(2.0 * p.x, 2.0 * p.y, 1.0);
        let rhs = p.length_squared();
        ata += row * row.transpose();
        atb += row * rhs;
    }

    let sol = ata.cholesky()?.solve(&atb);
    let center = DVec2::new(sol[0], sol[1]);
    let r2 = sol[2] + center.length_squared();
    if !r2.is_finite() || r2 <= 0.0 {
        return None;
    }
    Some((center, r2.sqrt()))
}

/// Algebraic least-squares sphere through 3D points.
///
/// Solves `|p|² = 2c·p + k` for the centre c and `r² = k + |c|²`.
/// Returns `None` for coplanar or too few points.
pub fn fit_sphere(points: &[DVec3]) -> Option<(DVec3, f64)> {
    if points.len() < 4 {
        return None;
    }

    let mut ata = Matrix4::<f64>::zeros();
    let mut atb = Vector4::<f64>::zeros();
    for p in points {
        let row = Vector4::new(2.0 * p.x, 2.0 * p.y, 2.0 * p.z, 1.0);
        let rhs = p.length_squared();
        ata += row * row.transpose();
        atb += row * rhs;
    }

    let sol = ata.cholesky()?.solve(&atb);
    let center = DVec3::new(sol[0], sol[1], sol[2]);
    let r2 = sol[3] + center.length_squared();
    if !r2.is_finite() || r2 <= 0.0 {
        return None;
    }
    Some((center, r2.sqrt()))
}
