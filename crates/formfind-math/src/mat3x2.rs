//! 3×2 matrix type for triangle-based constraints.
//!
//! A triangle is a 2D manifold embedded in 3D space. Its current edges,
//! expressed in an orthonormal frame of its own plane, give a 2×2 strain
//! gradient; the frame itself is a 3×2 matrix with orthonormal columns.

use glam::{DMat2, DVec2, DVec3};

/// A 3×2 column-major matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x2 {
    /// First column (3 components).
    pub col0: DVec3,
    /// Second column (3 components).
    pub col1: DVec3,
}

impl Mat3x2 {
    /// Creates a new 3×2 matrix from two column vectors.
    #[inline]
    pub fn from_cols(col0: DVec3, col1: DVec3) -> Self {
        Self { col0, col1 }
    }

    /// The zero matrix.
    pub const ZERO: Self = Self {
        col0: DVec3::ZERO,
        col1: DVec3::ZERO,
    };

    /// Identity-like matrix (first two columns of 3×3 identity).
    pub const IDENTITY: Self = Self {
        col0: DVec3::X,
        col1: DVec3::Y,
    };

    /// Orthonormal frame of the plane spanned by `e0` and `e1`.
    ///
    /// The first axis follows `e0`; the second is the Gram-Schmidt
    /// remainder of `e1`. Returns `None` for degenerate edges.
    pub fn orthonormal_frame(e0: DVec3, e1: DVec3, eps: f64) -> Option<Self> {
        let len0 = e0.length();
        if len0 < eps {
            return None;
        }
        let u = e0 / len0;
        let rest = e1 - u * e1.dot(u);
        let len1 = rest.length();
        if len1 < eps {
            return None;
        }
        Some(Self::from_cols(u, rest / len1))
    }

    /// Computes Fᵀ · v for each column pair: the 2×2 matrix `selfᵀ · [a, b]`.
    #[inline]
    pub fn transpose_mul(&self, a: DVec3, b: DVec3) -> DMat2 {
        DMat2::from_cols(
            DVec2::new(self.col0.dot(a), self.col1.dot(a)),
            DVec2::new(self.col0.dot(b), self.col1.dot(b)),
        )
    }

    /// Multiply by a 2×2 matrix: `self · m`.
    #[inline]
    pub fn mul_mat2(&self, m: DMat2) -> Self {
        Self {
            col0: self.col0 * m.x_axis.x + self.col1 * m.x_axis.y,
            col1: self.col0 * m.y_axis.x + self.col1 * m.y_axis.y,
        }
    }

    /// Frobenius norm squared: ||F||_F^2 = trace(F^T F).
    #[inline]
    pub fn frobenius_norm_sq(&self) -> f64 {
        self.col0.length_squared() + self.col1.length_squared()
    }
}

impl std::ops::Sub for Mat3x2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            col0: self.col0 - rhs.col0,
            col1: self.col1 - rhs.col1,
        }
    }
}

impl std::ops::Mul<f64> for Mat3x2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            col0: self.col0 * rhs,
            col1: self.col1 * rhs,
        }
    }
}
