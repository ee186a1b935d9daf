//! Regression constraints: points pulled onto a best-fit primitive.
//!
//! All four kinds use the mean-centring operator, so the fitted primitive
//! is free to translate; only the shape of the point set is constrained.
//! The fit is recomputed from the current positions on every projection.

use formfind_math::fit::{fit_circle, fit_sphere, principal_axes};
use formfind_math::{DVec2, DVec3};
use formfind_types::constants::EPSILON;
use formfind_types::{ConstraintKind, FormfindResult};

use super::{centred, mean_centred_stencil, set_none, write_centred, Constraint, StencilEntry};

/// Line, Plane, Circle or Sphere fit over any number of points.
#[derive(Debug, Clone)]
pub struct Regression {
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
}

impl Regression {
    pub fn new(kind: ConstraintKind, indices: Vec<usize>, weight: f64) -> Self {
        Self {
            kind,
            indices,
            weight,
        }
    }
}

impl Constraint for Regression {
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
        self.indices.len()
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        mean_centred_stencil(self.indices.len())
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let points = centred(positions, &self.indices);
        let targets = match self.kind {
            ConstraintKind::Line => onto_line(&points),
            ConstraintKind::Plane => onto_plane(&points),
            ConstraintKind::Circle => onto_circle(&points),
            _ => onto_sphere(&points),
        };
        write_centred(&targets, out);
    }

    fn scalars(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_none(self.kind, self.indices.len(), scalars)
    }
}

fn onto_line(points: &[DVec3]) -> Vec<DVec3> {
    let axis = principal_axes(points).axes[0];
    points.iter().map(|&q| axis * axis.dot(q)).collect()
}

fn onto_plane(points: &[DVec3]) -> Vec<DVec3> {
    let normal = principal_axes(points).axes[2];
    points.iter().map(|&q| q - normal * normal.dot(q)).collect()
}

/// Flattens onto the best-fit plane, then pushes each point radially onto
/// the in-plane circle. Collinear input stays on the plane only.
fn onto_circle(points: &[DVec3]) -> Vec<DVec3> {
    let axes = principal_axes(points).axes;
    let (u, v) = (axes[0], axes[1]);
    let planar: Vec<DVec2> = points.iter().map(|&q| DVec2::new(q.dot(u), q.dot(v))).collect();

    let Some((center, radius)) = fit_circle(&planar) else {
        return planar.iter().map(|s| u * s.x + v * s.y).collect();
    };

    planar
        .iter()
        .map(|&s| {
            let offset = s - center;
            let dir = if offset.length() > EPSILON {
                offset.normalize()
            } else {
                DVec2::X
            };
            let t = center + dir * radius;
            u * t.x + v * t.y
        })
        .collect()
}

/// Pushes each point radially onto the best-fit sphere. Coplanar input
/// is returned unchanged.
fn onto_sphere(points: &[DVec3]) -> Vec<DVec3> {
    let Some((center, radius)) = fit_sphere(points) else {
        return points.to_vec();
    };
    points
        .iter()
        .map(|&q| {
            let offset = q - center;
            let dir = if offset.length() > EPSILON {
                offset.normalize()
            } else {
                DVec3::X
            };
            center + dir * radius
        })
        .collect()
}
