//! Matrix decompositions for constraint projections.
//!
//! Provides SVD of 2×2 and 3×3 matrices (strain, area and volume
//! projections) and Procrustes alignment (rigid and similarity shape
//! matching). The factorizations come from `nalgebra`; inputs and outputs
//! stay in `glam` types so the rest of the solver never sees two
//! vector libraries.

use formfind_types::constants::EPSILON;
use glam::{DMat2, DMat3, DVec2, DVec3};
use nalgebra::{Matrix2, Matrix3};

/// Convert a glam 3×3 matrix to nalgebra.
pub fn to_na3(m: DMat3) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| m.col(c)[r])
}

/// Convert a nalgebra 3×3 matrix to glam.
pub fn from_na3(m: &Matrix3<f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]),
        DVec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]),
        DVec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]),
    )
}

fn to_na2(m: DMat2) -> Matrix2<f64> {
    Matrix2::from_fn(|r, c| m.col(c)[r])
}

fn from_na2(m: &Matrix2<f64>) -> DMat2 {
    DMat2::from_cols(
        DVec2::new(m[(0, 0)], m[(1, 0)]),
        DVec2::new(m[(0, 1)], m[(1, 1)]),
    )
}

/// Outer product `a · bᵀ`.
#[inline]
pub fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Singular value decomposition `M = U · diag(S) · Vᵀ` of a 3×3 matrix.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    pub u: DMat3,
    pub singular: DVec3,
    pub v: DMat3,
}

impl Svd3 {
    /// Decompose `m`. Returns `None` if the iteration fails to produce U or V.
    pub fn new(m: DMat3) -> Option<Self> {
        let svd = to_na3(m).svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;
        let s = svd.singular_values;
        Some(Self {
            u: from_na3(&u),
            singular: DVec3::new(s[0], s[1], s[2]),
            v: from_na3(&v_t.transpose()),
        })
    }

    /// Rebuild `U · diag(s) · Vᵀ` with replacement singular values.
    pub fn compose(&self, s: DVec3) -> DMat3 {
        self.u * DMat3::from_diagonal(s) * self.v.transpose()
    }

    /// Index of the smallest singular value.
    pub fn smallest(&self) -> usize {
        let s = self.singular;
        if s.x <= s.y && s.x <= s.z {
            0
        } else if s.y <= s.z {
            1
        } else {
            2
        }
    }
}

/// Singular value decomposition of a 2×2 matrix.
#[derive(Debug, Clone, Copy)]
pub struct Svd2 {
    pub u: DMat2,
    pub singular: DVec2,
    pub v: DMat2,
}

impl Svd2 {
    pub fn new(m: DMat2) -> Option<Self> {
        let svd = to_na2(m).svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;
        let s = svd.singular_values;
        Some(Self {
            u: from_na2(&u),
            singular: DVec2::new(s[0], s[1]),
            v: from_na2(&v_t.transpose()),
        })
    }

    pub fn compose(&self, s: DVec2) -> DMat2 {
        self.u * DMat2::from_diagonal(s) * self.v.transpose()
    }
}

/// Result of aligning a centred source shape onto a centred target.
#[derive(Debug, Clone, Copy)]
pub struct Alignment {
    /// Proper rotation (determinant +1).
    pub rotation: DMat3,
    /// Uniform scale (1.0 when scaling is not allowed).
    pub scale: f64,
    /// Squared residual Σ ||tᵢ − s·R·qᵢ||².
    pub residual: f64,
}

impl Alignment {
    /// Apply the alignment to a centred source point.
    #[inline]
    pub fn apply(&self, q: DVec3) -> DVec3 {
        self.rotation * q * self.scale
    }
}

/// Orthogonal Procrustes (Kabsch) alignment of `source` onto `target`.
///
/// Both point sets must already be centred on their centroids and have the
/// same length. Finds the rotation R (and, if `allow_scale`, the uniform
/// scale s) minimizing Σ ||tᵢ − s·R·qᵢ||². Reflections are excluded by
/// flipping the axis of the smallest singular value.
pub fn procrustes(source: &[DVec3], target: &[DVec3], allow_scale: bool) -> Option<Alignment> {
    if source.len() != target.len() {
        return None;
    }

    // Cross-covariance H = Σ tᵢ qᵢᵀ
    let mut h = DMat3::ZERO;
    for (&q, &t) in source.iter().zip(target) {
        h += outer(t, q);
    }

    let svd = Svd3::new(h)?;
    let mut d = DVec3::ONE;
    if (svd.u * svd.v.transpose()).determinant() < 0.0 {
        d[svd.smallest()] = -1.0;
    }
    let rotation = svd.u * DMat3::from_diagonal(d) * svd.v.transpose();

    let scale = if allow_scale {
        let norm: f64 = source.iter().map(|q| q.length_squared()).sum();
        if norm > EPSILON {
            (svd.singular * d).element_sum() / norm
        } else {
            1.0
        }
    } else {
        1.0
    };

    let mut alignment = Alignment {
        rotation,
        scale,
        residual: 0.0,
    };
    alignment.residual = source
        .iter()
        .zip(target)
        .map(|(&q, &t)| (t - alignment.apply(q)).length_squared())
        .sum();
    Some(alignment)
}

/// Minimal-change positions reproducing a set of operator targets.
///
/// Given a small dense operator `S` (`rows × current.len()`, as
/// `(row, column, value)` entries), the current positions `p` and the
/// targets `r`, returns `p + S⁺ (r − S p)`: the positions closest to `p`
/// whose image under `S` best matches `r`. Falls back to `p` when the
/// pseudo-inverse cannot be formed.
pub fn least_change_targets(
    rows: usize,
    entries: &[(usize, usize, f64)],
    current: &[DVec3],
    targets: &[DVec3],
) -> Vec<DVec3> {
    let cols = current.len();
    let mut s = nalgebra::DMatrix::<f64>::zeros(rows, cols);
    for &(r, c, v) in entries {
        s[(r, c)] += v;
    }

    let p = nalgebra::DMatrix::<f64>::from_fn(cols, 3, |i, j| current[i][j]);
    let r = nalgebra::DMatrix::<f64>::from_fn(rows, 3, |i, j| targets[i][j]);

    let Ok(pinv) = s.clone().pseudo_inverse(EPSILON) else {
        return current.to_vec();
    };
    let x = &p + pinv * (r - s * &p);

    (0..cols)
        .map(|i| DVec3::new(x[(i, 0)], x[(i, 1)], x[(i, 2)]))
        .collect()
}
