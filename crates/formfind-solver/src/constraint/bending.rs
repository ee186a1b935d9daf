//! Bending constraint on a pair of triangles sharing an edge.
//!
//! The operator is the cotangent-weighted mean-curvature stencil of the
//! two-triangle patch. Applied to the positions it yields a
//! mean-curvature normal; the projection rescales that vector so its
//! length stays within `[min, max]` times its rest length.
//!
//! ## Geometry
//!
//! ```text
//!        wa
//!       / \
//!      /   \
//!    v0 ─── v1
//!      \   /
//!       \ /
//!        wb
//! ```
//!
//! Index order is `[v0, v1, wa, wb]`: shared edge first, then the wing
//! vertex of each adjacent triangle.

use formfind_math::DVec3;
use formfind_types::constants::{DEGENERATE_THRESHOLD, EPSILON};
use formfind_types::{ConstraintKind, FormfindResult};

use super::{clamp_range, set_range, Constraint, StencilEntry};

/// Curvature-preserving bending element.
#[derive(Debug, Clone)]
pub struct Bending {
    indices: Vec<usize>,
    weight: f64,
    /// Cotangent stencil for `[v0, v1, wa, wb]`; sums to zero.
    coefficients: [f64; 4],
    /// Rest length of the mean-curvature vector.
    rest_norm: f64,
    range: (f64, f64),
}

/// Cotangent of the angle between `v` and `w`.
fn cotangent(v: DVec3, w: DVec3) -> f64 {
    let cross = v.cross(w).length();
    v.dot(w) / cross.max(EPSILON)
}

impl Bending {
    pub fn new(indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let [p0, p1, pa, pb] = [0, 1, 2, 3].map(|k| positions[indices[k]]);

        let e0 = p1 - p0;
        let e1 = pa - p0;
        let e2 = pb - p0;
        let e3 = pa - p1;
        let e4 = pb - p1;

        let c01 = cotangent(e0, e1);
        let c02 = cotangent(e0, e2);
        let c03 = cotangent(-e0, e3);
        let c04 = cotangent(-e0, e4);

        let area_a = 0.5 * e0.cross(e1).length();
        let area_b = 0.5 * e0.cross(e2).length();
        let scale = -3.0 / (2.0 * (area_a + area_b).max(EPSILON));

        let coefficients = [
            scale * (c03 + c04),
            scale * (c01 + c02),
            scale * (-c01 - c03),
            scale * (-c02 - c04),
        ];

        let mut bending = Self {
            indices,
            weight,
            coefficients,
            rest_norm: 0.0,
            range: (1.0, 1.0),
        };
        bending.rest_norm = bending.curvature_normal(positions).length();
        bending
    }

    fn curvature_normal(&self, positions: &[DVec3]) -> DVec3 {
        self.indices
            .iter()
            .zip(self.coefficients)
            .map(|(&i, c)| positions[i] * c)
            .sum()
    }
}

impl Constraint for Bending {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Bending
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn rows(&self) -> usize {
        1
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(slot, &c)| (0, slot, c))
            .collect()
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        // A flat rest patch pulls straight back to zero curvature.
        if self.rest_norm <= DEGENERATE_THRESHOLD {
            out[0] = DVec3::ZERO;
            return;
        }
        let normal = self.curvature_normal(positions);
        let length = normal.length();
        out[0] = if length > DEGENERATE_THRESHOLD {
            let ratio = clamp_range(length / self.rest_norm, self.range.0, self.range.1);
            normal * (self.rest_norm * ratio / length)
        } else {
            normal
        };
    }

    fn scalars(&self) -> Vec<f64> {
        vec![self.range.0, self.range.1]
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_range(ConstraintKind::Bending, self.indices.len(), scalars, &mut self.range)
    }
}
