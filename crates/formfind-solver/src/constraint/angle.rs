//! Corner angle constraint.
//!
//! Index order is `[corner, a, b]`. The operator rows are the two edges
//! `a − corner` and `b − corner`; when the angle between them leaves
//! `[min, max]` both edges are rotated symmetrically in their common
//! plane to the nearest bound, keeping their lengths.

use std::f64::consts::PI;

use formfind_math::DVec3;
use formfind_types::constants::EPSILON;
use formfind_types::{ConstraintKind, FormfindResult};

use super::{clamp_range, set_range, Constraint, StencilEntry};

#[derive(Debug, Clone)]
pub struct Angle {
    indices: Vec<usize>,
    weight: f64,
    range: (f64, f64),
}

impl Angle {
    /// Starts unconstrained: `[0, π]`.
    pub fn new(indices: Vec<usize>, weight: f64) -> Self {
        Self {
            indices,
            weight,
            range: (0.0, PI),
        }
    }
}

/// Rodrigues rotation of `v` about the unit `axis`.
fn rotate_around_axis(v: DVec3, axis: DVec3, angle: f64) -> DVec3 {
    let (sin_a, cos_a) = angle.sin_cos();
    v * cos_a + axis.cross(v) * sin_a + axis * axis.dot(v) * (1.0 - cos_a)
}

impl Constraint for Angle {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Angle
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
        vec![(0, 0, -1.0), (0, 1, 1.0), (1, 0, -1.0), (1, 2, 1.0)]
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let corner = positions[self.indices[0]];
        let ea = positions[self.indices[1]] - corner;
        let eb = positions[self.indices[2]] - corner;
        out[0] = ea;
        out[1] = eb;

        let (la, lb) = (ea.length(), eb.length());
        if la < EPSILON || lb < EPSILON {
            return;
        }
        let (ua, ub) = (ea / la, eb / lb);
        let angle = ua.dot(ub).clamp(-1.0, 1.0).acos();
        let target = clamp_range(angle, self.range.0, self.range.1);
        if (target - angle).abs() < EPSILON {
            return;
        }

        // Collinear edges span no plane; any perpendicular axis will do.
        let axis = ua
            .cross(ub)
            .try_normalize()
            .unwrap_or_else(|| ua.any_orthonormal_vector());
        let half = 0.5 * (target - angle);
        out[0] = rotate_around_axis(ea, axis, -half);
        out[1] = rotate_around_axis(eb, axis, half);
    }

    fn scalars(&self) -> Vec<f64> {
        vec![self.range.0, self.range.1]
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_range(ConstraintKind::Angle, self.indices.len(), scalars, &mut self.range)
    }
}
