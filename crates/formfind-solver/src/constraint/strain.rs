//! Strain constraints on edges, triangles and tetrahedra.
//!
//! Each element stores the inverse of its rest edge matrix. The operator
//! maps current positions to the deformation gradient `F = E · E₀⁻¹`;
//! projection clamps the singular values of `F` (stretch limits) or
//! corrects them so their product stays inside a range (area/volume).

use formfind_math::decomposition::{Svd2, Svd3};
use formfind_math::mat3x2::Mat3x2;
use formfind_math::{DMat2, DMat3, DVec2, DVec3};
use formfind_types::constants::{EPSILON, SINGULAR_VALUE_CORRECTION_ROUNDS};
use formfind_types::{ConstraintKind, FormfindResult};

use super::{clamp_range, set_range, Constraint, StencilEntry};

// ─── EdgeStrain ──────────────────────────────────────────────

/// Keeps an edge's length within `[min·rest, max·rest]`.
#[derive(Debug, Clone)]
pub struct EdgeStrain {
    indices: Vec<usize>,
    weight: f64,
    rest_length: f64,
    range: (f64, f64),
}

impl EdgeStrain {
    pub fn new(indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let rest_length = (positions[indices[1]] - positions[indices[0]]).length();
        Self {
            indices,
            weight,
            rest_length,
            range: (1.0, 1.0),
        }
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }
}

impl Constraint for EdgeStrain {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::EdgeStrain
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
        vec![(0, 0, -1.0), (0, 1, 1.0)]
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let edge = positions[self.indices[1]] - positions[self.indices[0]];
        let length = edge.length();
        // Coincident endpoints: any direction is as good as another.
        let direction = if length > EPSILON { edge / length } else { DVec3::X };
        let lo = self.range.0 * self.rest_length;
        let hi = self.range.1 * self.rest_length;
        out[0] = direction * clamp_range(length, lo, hi);
    }

    fn scalars(&self) -> Vec<f64> {
        vec![self.rest_length, self.range.0, self.range.1]
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        self.kind().check_scalar_count(scalars.len(), self.indices.len())?;
        self.rest_length = scalars[0];
        self.range = (scalars[1], scalars[2]);
        Ok(())
    }
}

// ─── TriangleStrain / Area ───────────────────────────────────

/// Triangle deformation constraint.
///
/// As `TriangleStrain` each singular value of the in-plane deformation
/// gradient is clamped to `[min, max]`; as `Area` the singular values are
/// corrected so that their product (the area ratio) lies in `[min, max]`.
#[derive(Debug, Clone)]
pub struct TriangleStrain {
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
    rest_inv: DMat2,
    range: (f64, f64),
}

impl TriangleStrain {
    pub fn new(kind: ConstraintKind, indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let p0 = positions[indices[0]];
        let e0 = positions[indices[1]] - p0;
        let e1 = positions[indices[2]] - p0;

        let rest_inv = Mat3x2::orthonormal_frame(e0, e1, EPSILON)
            .map(|frame| frame.transpose_mul(e0, e1))
            .filter(|m| m.determinant().abs() > EPSILON)
            .map(|m| m.inverse())
            .unwrap_or(DMat2::IDENTITY);

        Self {
            kind,
            indices,
            weight,
            rest_inv,
            range: (1.0, 1.0),
        }
    }

    /// Current deformation gradient columns in world space.
    fn gradient(&self, positions: &[DVec3]) -> (DVec3, DVec3) {
        let p0 = positions[self.indices[0]];
        let e0 = positions[self.indices[1]] - p0;
        let e1 = positions[self.indices[2]] - p0;
        let r = self.rest_inv;
        let f0 = e0 * r.x_axis.x + e1 * r.x_axis.y;
        let f1 = e0 * r.y_axis.x + e1 * r.y_axis.y;
        (f0, f1)
    }
}

impl Constraint for TriangleStrain {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn rows(&self) -> usize {
        2
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        let mut entries = Vec::with_capacity(6);
        for (row, col) in [self.rest_inv.x_axis, self.rest_inv.y_axis].into_iter().enumerate() {
            entries.push((row, 0, -(col.x + col.y)));
            entries.push((row, 1, col.x));
            entries.push((row, 2, col.y));
        }
        entries
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let (f0, f1) = self.gradient(positions);
        out[0] = f0;
        out[1] = f1;

        // Degenerate triangle: leave the gradient as is.
        let Some(frame) = Mat3x2::orthonormal_frame(f0, f1, EPSILON) else {
            return;
        };
        let local = frame.transpose_mul(f0, f1);
        let Some(svd) = Svd2::new(local) else {
            return;
        };

        let s = match self.kind {
            ConstraintKind::Area => correct_product2(svd.singular, self.range),
            _ => DVec2::new(
                clamp_range(svd.singular.x, self.range.0, self.range.1),
                clamp_range(svd.singular.y, self.range.0, self.range.1),
            ),
        };
        let target = frame.mul_mat2(svd.compose(s));
        out[0] = target.col0;
        out[1] = target.col1;
    }

    fn scalars(&self) -> Vec<f64> {
        vec![self.range.0, self.range.1]
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_range(self.kind, self.indices.len(), scalars, &mut self.range)
    }
}

// ─── TetrahedronStrain / Volume ──────────────────────────────

/// Tetrahedron deformation constraint; `Volume` limits the determinant
/// of the deformation gradient instead of each singular value.
#[derive(Debug, Clone)]
pub struct TetrahedronStrain {
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
    rest_inv: DMat3,
    range: (f64, f64),
}

impl TetrahedronStrain {
    pub fn new(kind: ConstraintKind, indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let edges = edge_matrix(positions, &indices);
        let rest_inv = if edges.determinant().abs() > EPSILON {
            edges.inverse()
        } else {
            DMat3::IDENTITY
        };
        Self {
            kind,
            indices,
            weight,
            rest_inv,
            range: (1.0, 1.0),
        }
    }
}

fn edge_matrix(positions: &[DVec3], indices: &[usize]) -> DMat3 {
    let p0 = positions[indices[0]];
    DMat3::from_cols(
        positions[indices[1]] - p0,
        positions[indices[2]] - p0,
        positions[indices[3]] - p0,
    )
}

impl Constraint for TetrahedronStrain {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn rows(&self) -> usize {
        3
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        let mut entries = Vec::with_capacity(12);
        for row in 0..3 {
            let col = self.rest_inv.col(row);
            entries.push((row, 0, -(col.x + col.y + col.z)));
            entries.push((row, 1, col.x));
            entries.push((row, 2, col.y));
            entries.push((row, 3, col.z));
        }
        entries
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let f = edge_matrix(positions, &self.indices) * self.rest_inv;
        let target = match Svd3::new(f) {
            Some(svd) => {
                let mut s = match self.kind {
                    ConstraintKind::Volume => correct_product3(svd.singular, self.range),
                    _ => DVec3::new(
                        clamp_range(svd.singular.x, self.range.0, self.range.1),
                        clamp_range(svd.singular.y, self.range.0, self.range.1),
                        clamp_range(svd.singular.z, self.range.0, self.range.1),
                    ),
                };
                // Inverted element: flip the weakest axis so the target is upright.
                if f.determinant() < 0.0 {
                    let k = svd.smallest();
                    s[k] = -s[k];
                }
                svd.compose(s)
            }
            None => f,
        };
        for (row, o) in out.iter_mut().enumerate().take(3) {
            *o = target.col(row);
        }
    }

    fn scalars(&self) -> Vec<f64> {
        vec![self.range.0, self.range.1]
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_range(self.kind, self.indices.len(), scalars, &mut self.range)
    }
}

// ─── Singular value correction ───────────────────────────────

/// Nudges `(s0, s1)` so that `s0·s1` falls in `range`, moving along the
/// gradient of the product from the original values.
fn correct_product2(original: DVec2, range: (f64, f64)) -> DVec2 {
    let mut s = original;
    let mut d = DVec2::ZERO;
    for _ in 0..SINGULAR_VALUE_CORRECTION_ROUNDS {
        let v = s.x * s.y;
        let f = v - clamp_range(v, range.0, range.1);
        let g = DVec2::new(s.y, s.x);
        let gg = g.length_squared();
        if gg < EPSILON {
            break;
        }
        d = -((f - g.dot(d)) / gg) * g;
        s = original + d;
    }
    s
}

/// Three-dimensional counterpart of [`correct_product2`].
fn correct_product3(original: DVec3, range: (f64, f64)) -> DVec3 {
    let mut s = original;
    let mut d = DVec3::ZERO;
    for _ in 0..SINGULAR_VALUE_CORRECTION_ROUNDS {
        let v = s.x * s.y * s.z;
        let f = v - clamp_range(v, range.0, range.1);
        let g = DVec3::new(s.y * s.z, s.x * s.z, s.x * s.y);
        let gg = g.length_squared();
        if gg < EPSILON {
            break;
        }
        d = -((f - g.dot(d)) / gg) * g;
        s = original + d;
    }
    s
}
