//! External forces for dynamic solves.
//!
//! Forces are accumulated once per time step into a per-point buffer and
//! enter the momentum prediction `p + v·h + f·h²/m`. Static solves ignore
//! them.

use formfind_math::DVec3;

/// A force law over the point set.
pub trait Force: Send + Sync {
    /// Adds this force's contribution to `forces` (one entry per point).
    fn accumulate(&self, positions: &[DVec3], forces: &mut [DVec3]);

    /// Mutable access for the editable single-point force.
    fn as_vertex_force_mut(&mut self) -> Option<&mut VertexForce> {
        None
    }
}

/// The same vector applied to every point (the "unary" force).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityForce {
    pub force: DVec3,
}

impl GravityForce {
    pub fn new(force: DVec3) -> Self {
        Self { force }
    }
}

impl Force for GravityForce {
    fn accumulate(&self, _positions: &[DVec3], forces: &mut [DVec3]) {
        for f in forces.iter_mut() {
            *f += self.force;
        }
    }
}

/// A vector applied to a single point, e.g. a user drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexForce {
    pub force: DVec3,
    pub index: usize,
}

impl VertexForce {
    pub fn new(force: DVec3, index: usize) -> Self {
        Self { force, index }
    }
}

impl Force for VertexForce {
    fn accumulate(&self, _positions: &[DVec3], forces: &mut [DVec3]) {
        if let Some(f) = forces.get_mut(self.index) {
            *f += self.force;
        }
    }

    fn as_vertex_force_mut(&mut self) -> Option<&mut VertexForce> {
        Some(self)
    }
}
