//! Dynamic state: per-point buffers for time-stepped solves.
//!
//! Positions stay in the [`PointStore`](crate::points::PointStore); this
//! holds what a dynamic solve needs on top of them: velocities, the
//! positions at the start of the step, the accumulated forces and the
//! inertial prediction (momentum) used on the right-hand side.

use formfind_math::DVec3;

use crate::config::Dynamics;
use crate::force::Force;

/// Velocities, previous positions, forces and momentum for `n` points.
#[derive(Debug, Clone)]
pub struct DynamicState {
    pub dynamics: Dynamics,

    // ─── Per-point buffers ───
    pub velocities: Vec<DVec3>,
    pub previous: Vec<DVec3>,
    pub forces: Vec<DVec3>,
    /// Inertial prediction `p + v·h + f·h²/m`.
    pub momentum: Vec<DVec3>,
}

impl DynamicState {
    /// Starts at rest.
    pub fn new(positions: &[DVec3], dynamics: Dynamics) -> Self {
        let n = positions.len();
        Self {
            dynamics,
            velocities: vec![DVec3::ZERO; n],
            previous: positions.to_vec(),
            forces: vec![DVec3::ZERO; n],
            momentum: positions.to_vec(),
        }
    }

    /// Recomputes the force buffer from scratch.
    pub fn accumulate_forces(&mut self, positions: &[DVec3], forces: &[Box<dyn Force>]) {
        self.forces.fill(DVec3::ZERO);
        for force in forces {
            force.accumulate(positions, &mut self.forces);
        }
    }

    /// Saves the step's starting positions and computes the momentum
    /// prediction; `positions` are moved onto it as the initial guess.
    pub fn predict(&mut self, positions: &mut [DVec3]) {
        let h = self.dynamics.time_step;
        let h2_over_m = h * h / self.dynamics.mass;
        self.previous.copy_from_slice(positions);
        for (i, p) in positions.iter_mut().enumerate() {
            self.momentum[i] = *p + self.velocities[i] * h + self.forces[i] * h2_over_m;
            *p = self.momentum[i];
        }
    }

    /// Velocity from the position change over the step, scaled by the
    /// damping (retention) factor: `v = damping · (p − p_prev) / h`.
    pub fn update_velocities(&mut self, positions: &[DVec3]) {
        let scale = self.dynamics.damping / self.dynamics.time_step;
        for (v, (p, prev)) in self
            .velocities
            .iter_mut()
            .zip(positions.iter().zip(&self.previous))
        {
            *v = (*p - *prev) * scale;
        }
    }

    /// Total kinetic energy `½ m Σ |v|²`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.dynamics.mass * self.velocities.iter().map(|v| v.length_squared()).sum::<f64>()
    }

    /// Drops all velocity, e.g. after an external position overwrite.
    pub fn reset_velocities(&mut self, positions: &[DVec3]) {
        self.velocities.fill(DVec3::ZERO);
        self.previous.copy_from_slice(positions);
    }
}
