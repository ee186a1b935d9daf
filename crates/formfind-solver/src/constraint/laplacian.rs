//! Umbrella Laplacian constraints.
//!
//! Index order is `[center, neighbour₀, neighbour₁, ...]`. The single
//! operator row is `p_c − mean(neighbours)`. `Laplacian` drives it to
//! zero (fairing); `LaplacianDisplacement` keeps it at its initial value.

use formfind_math::DVec3;
use formfind_types::{ConstraintKind, FormfindResult};

use super::{apply_stencil, gather, set_none, Constraint, StencilEntry};

#[derive(Debug, Clone)]
pub struct Laplacian {
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
    /// Target Laplacian vector: zero, or the rest displacement.
    target: DVec3,
}

impl Laplacian {
    pub fn new(kind: ConstraintKind, indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let mut laplacian = Self {
            kind,
            indices,
            weight,
            target: DVec3::ZERO,
        };
        if kind == ConstraintKind::LaplacianDisplacement {
            laplacian.target = laplacian.current(positions);
        }
        laplacian
    }

    fn current(&self, positions: &[DVec3]) -> DVec3 {
        apply_stencil(&self.stencil(), 1, &self.indices, positions)[0]
    }
}

impl Constraint for Laplacian {
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
        1
    }

    fn stencil(&self) -> Vec<StencilEntry> {
        let share = -1.0 / (self.indices.len() - 1) as f64;
        std::iter::once((0, 0, 1.0))
            .chain((1..self.indices.len()).map(|slot| (0, slot, share)))
            .collect()
    }

    fn project(&self, _positions: &[DVec3], out: &mut [DVec3]) {
        out[0] = self.target;
    }

    /// The center moves to the neighbour centroid (plus the rest offset);
    /// neighbours stay put.
    fn local_targets(&self, positions: &[DVec3]) -> Vec<DVec3> {
        let mut targets = gather(positions, &self.indices);
        let neighbours = &targets[1..];
        let centroid = neighbours.iter().copied().sum::<DVec3>() / neighbours.len() as f64;
        targets[0] = centroid + self.target;
        targets
    }

    fn scalars(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        set_none(self.kind, self.indices.len(), scalars)
    }
}
