//! Closeness: pulls one point toward a stored position.

use formfind_math::DVec3;
use formfind_types::{ConstraintKind, FormfindResult};

use super::{Constraint, StencilEntry};

/// Anchors a point to `target`, initially its own position.
#[derive(Debug, Clone)]
pub struct Closeness {
    indices: Vec<usize>,
    weight: f64,
    target: DVec3,
}

impl Closeness {
    pub fn new(indices: Vec<usize>, weight: f64, positions: &[DVec3]) -> Self {
        let target = positions[indices[0]];
        Self {
            indices,
            weight,
            target,
        }
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }
}

impl Constraint for Closeness {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Closeness
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
        vec![(0, 0, 1.0)]
    }

    fn project(&self, _positions: &[DVec3], out: &mut [DVec3]) {
        out[0] = self.target;
    }

    fn scalars(&self) -> Vec<f64> {
        self.target.to_array().to_vec()
    }

    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()> {
        self.kind().check_scalar_count(scalars.len(), self.indices.len())?;
        self.target = DVec3::new(scalars[0], scalars[1], scalars[2]);
        Ok(())
    }
}
