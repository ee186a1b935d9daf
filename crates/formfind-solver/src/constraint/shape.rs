//! Shape-matching constraints over mean-centred point sets.
//!
//! - [`ShapeMatch`]: aligns each candidate shape onto the current points
//!   (rotation, plus uniform scale for `Similarity`) and targets the best
//!   fitting one.
//! - [`Rectangle`]: best-fit rectangle in the points' plane.
//! - [`Parallelogram`]: nearest parallelogram (closed form).

use formfind_math::decomposition::procrustes;
use formfind_math::fit::principal_axes;
use formfind_math::{DMat2, DVec2, DVec3};
use formfind_types::constants::{CANDIDATE_TIE_TOLERANCE, EPSILON, RECTANGLE_FIT_ROUNDS};
use formfind_types::{ConstraintKind, FormfindResult};

use super::{
    centred, gather, mean_centred_stencil, set_none, write_centred, Constraint, StencilEntry,
};

// ─── Similarity / Rigid ──────────────────────────────────────

/// Matches the points against one or more candidate shapes.
#[derive(Debug, Clone)]
pub struct ShapeMatch {
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
    /// Candidate shapes as set, flattened.
    raw: Vec<f64>,
    /// Candidate shapes, each centred on its own centroid.
    candidates: Vec<Vec<DVec3>>,
}

impl ShapeMatch {
    /// The initial positions become the single default candidate.
    pub fn new(kind: ConstraintKind, indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let initial = gather(positions, &indices);
        let raw = initial.iter().flat_map(|p| p.to_array()).collect();
        let candidates = vec![centred_shape(initial)];
        Self {
            kind,
            indices,
            weight,
            raw,
            candidates,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn allows_scale(&self) -> bool {
        self.kind == ConstraintKind::Similarity
    }
}

fn centred_shape(mut shape: Vec<DVec3>) -> Vec<DVec3> {
    let mean = shape.iter().copied().sum::<DVec3>() / shape.len().max(1) as f64;
    for p in &mut shape {
        *p -= mean;
    }
    shape
}

impl Constraint for ShapeMatch {
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
        let current = centred(positions, &self.indices);

        // A later candidate must beat the best by more than the tie
        // tolerance, so ties keep the earliest candidate.
        let mut best: Option<(f64, Vec<DVec3>)> = None;
        for candidate in &self.candidates {
            let Some(alignment) = procrustes(candidate, &current, self.allows_scale()) else {
                continue;
            };
            if best.as_ref().is_some_and(|(r, _)| {
                alignment.residual >= *r - CANDIDATE_TIE_TOLERANCE * (1.0 + *r)
            }) {
                continue;
            }
            let fitted = candidate.iter().map(|&q| alignment.apply(q)).collect();
            best = Some((alignment.residual, fitted));
        }

        match best {
            Some((_, fitted)) => write_centred(&fitted, out),
            None => write_centred(&current, out),
        }
    }

    fn scalars(&self) -> Vec<f64> {
        self.raw.clone()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        let n = self.indices.len();
        self.kind.check_scalar_count(scalars.len(), n)?;
        self.candidates = scalars
            .chunks_exact(3 * n)
            .map(|shape| {
                centred_shape(
                    shape
                        .chunks_exact(3)
                        .map(|c| DVec3::new(c[0], c[1], c[2]))
                        .collect(),
                )
            })
            .collect();
        self.raw = scalars.to_vec();
        Ok(())
    }
}

// ─── Rectangle ───────────────────────────────────────────────

/// Corner signs of the template rectangle, counter-clockwise.
const CORNER_SIGNS: [DVec2; 4] = [
    DVec2::new(-1.0, -1.0),
    DVec2::new(1.0, -1.0),
    DVec2::new(1.0, 1.0),
    DVec2::new(-1.0, 1.0),
];

/// Four points, in order around the perimeter, pulled onto a rectangle.
#[derive(Debug, Clone)]
pub struct Rectangle {
    indices: Vec<usize>,
    weight: f64,
}

impl Rectangle {
    pub fn new(indices: Vec<usize>, weight: f64) -> Self {
        Self { indices, weight }
    }
}

/// Best-fit rectangle through four ordered, centred 2D points.
///
/// Alternates between fitting the half extents for a fixed orientation
/// and the orientation (2D Procrustes) for fixed extents.
pub fn fit_rectangle(points: &[DVec2; 4]) -> [DVec2; 4] {
    let along = (points[1] - points[0]) + (points[2] - points[3]);
    let mut angle = if along.length() > EPSILON {
        along.y.atan2(along.x)
    } else {
        0.0
    };

    let mut template = [DVec2::ZERO; 4];
    for _ in 0..RECTANGLE_FIT_ROUNDS {
        let rotation = DMat2::from_angle(angle);
        let inverse = rotation.transpose();

        let mut half = DVec2::ZERO;
        for (p, sign) in points.iter().zip(CORNER_SIGNS) {
            half += inverse * *p * sign;
        }
        half *= 0.25;
        for (t, sign) in template.iter_mut().zip(CORNER_SIGNS) {
            *t = half * sign;
        }

        let (mut dot, mut cross) = (0.0, 0.0);
        for (t, p) in template.iter().zip(points) {
            dot += t.dot(*p);
            cross += t.perp_dot(*p);
        }
        if dot.abs() + cross.abs() > EPSILON {
            angle = cross.atan2(dot);
        }
    }

    let rotation = DMat2::from_angle(angle);
    template.map(|t| rotation * t)
}

impl Constraint for Rectangle {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Rectangle
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn rows(&self) -> usize {
        4
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        mean_centred_stencil(4)
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let points = centred(positions, &self.indices);
        let axes = principal_axes(&points).axes;
        let (u, v) = (axes[0], axes[1]);
        let planar = [0, 1, 2, 3].map(|k| DVec2::new(points[k].dot(u), points[k].dot(v)));
        let fitted = fit_rectangle(&planar).map(|t| u * t.x + v * t.y);
        write_centred(&fitted, out);
    }

    fn scalars(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_none(ConstraintKind::Rectangle, 4, scalars)
    }
}

// ─── Parallelogram ───────────────────────────────────────────

/// Four ordered points pulled onto the nearest parallelogram, i.e. the
/// configuration where `p0 − p1 + p2 − p3 = 0`.
#[derive(Debug, Clone)]
pub struct Parallelogram {
    indices: Vec<usize>,
    weight: f64,
}

impl Parallelogram {
    pub fn new(indices: Vec<usize>, weight: f64) -> Self {
        Self { indices, weight }
    }
}

impl Constraint for Parallelogram {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Parallelogram
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn rows(&self) -> usize {
        4
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        mean_centred_stencil(4)
    }

    fn project(&self, positions: &[DVec3], out: &mut [DVec3]) {
        let q = centred(positions, &self.indices);
        let skew = (q[0] - q[1] + q[2] - q[3]) * 0.25;
        out[0] = q[0] - skew;
        out[1] = q[1] + skew;
        out[2] = q[2] - skew;
        out[3] = q[3] + skew;
    }

    fn scalars(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_none(ConstraintKind::Parallelogram, 4, scalars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_fit_keeps_a_rectangle() {
        let rect = [
            DVec2::new(-2.0, -1.0),
            DVec2::new(2.0, -1.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(-2.0, 1.0),
        ];
        let fitted = fit_rectangle(&rect);
        for (a, b) in fitted.iter().zip(&rect) {
            assert!((*a - *b).length() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn rectangle_fit_squares_up_a_skewed_quad() {
        let quad = [
            DVec2::new(-2.2, -1.0),
            DVec2::new(1.8, -1.0),
            DVec2::new(2.2, 1.0),
            DVec2::new(-1.8, 1.0),
        ];
        let f = fitted_rectangle_edges(fit_rectangle(&quad));
        assert!(f.0.dot(f.1).abs() < 1e-9, "adjacent edges not perpendicular");
    }

    fn fitted_rectangle_edges(f: [DVec2; 4]) -> (DVec2, DVec2) {
        (f[1] - f[0], f[3] - f[0])
    }
}
