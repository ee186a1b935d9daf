//! Session drivers for the two runtime modes.
//!
//! - [`run_static`]: build a solver, project for a fixed number of
//!   iterations, read the points out and dispose.
//! - [`LiveSession`]: a solver kept by the caller across repeated calls.
//!   Each [`LiveSession::step`] either rebuilds (reset) or re-applies the
//!   current signature scalars and advances the solve; the returned
//!   `reschedule` flag tells the caller whether to call again.

use formfind_math::DVec3;
use formfind_types::{ConstraintId, FormfindError, FormfindResult};

use crate::config::{LiveSettings, SolveMode, StaticSettings};
use crate::signature::ConstraintSignature;
use crate::solver::Solver;

/// Outcome of a static run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutput {
    pub iterations: u64,
    pub constraint_count: usize,
    pub points: Vec<DVec3>,
}

/// Builds a solver from `signatures`, projects statically and disposes it.
pub fn run_static(
    signatures: &[ConstraintSignature],
    points: Vec<DVec3>,
    settings: &StaticSettings,
) -> FormfindResult<SolveOutput> {
    settings.validate()?;
    let mut solver = Solver::new(points)?;
    for signature in signatures {
        solver.add_signature(signature)?;
    }
    solver.initialize(SolveMode::Static)?;
    solver.solve(settings.iterations)?;

    let output = SolveOutput {
        iterations: solver.iteration_count(),
        constraint_count: solver.constraint_count(),
        points: solver.points().to_vec(),
    };
    solver.dispose()?;
    Ok(output)
}

/// Where a signature group's constraint lives in the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditableSlot {
    pub signature: usize,
    pub group: usize,
    pub id: ConstraintId,
}

/// Outcome of one live step.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveOutput {
    /// Iterations since the last reset.
    pub iterations: u64,
    pub constraint_count: usize,
    pub points: Vec<DVec3>,
    /// `false` when paused: the caller should not schedule another step.
    pub reschedule: bool,
}

/// A live solve owned by the caller between steps.
#[derive(Default)]
pub struct LiveSession {
    solver: Option<Solver>,
    slots: Vec<EditableSlot>,
    iterations: u64,
}

impl LiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a solver has been built.
    pub fn is_running(&self) -> bool {
        self.solver.is_some()
    }

    pub fn solver(&self) -> Option<&Solver> {
        self.solver.as_ref()
    }

    pub fn slots(&self) -> &[EditableSlot] {
        &self.slots
    }

    /// Advances the session.
    ///
    /// With `reset` set (or on the first call) the solver is rebuilt from
    /// `points` and `signatures` and initialised without solving. Otherwise
    /// the signatures' scalars are re-applied to their constraints, matched
    /// by signature and group position, and `iterations` are solved.
    pub fn step(
        &mut self,
        signatures: &[ConstraintSignature],
        points: &[DVec3],
        settings: &LiveSettings,
    ) -> FormfindResult<LiveOutput> {
        settings.validate()?;

        if settings.reset || self.solver.is_none() {
            let (solver, slots) = build(signatures, points, settings)?;
            if let Some(mut old) = self.solver.replace(solver) {
                old.dispose()?;
            }
            self.slots = slots;
            self.iterations = 0;
            tracing::debug!(slots = self.slots.len(), "live_session_reset");
        } else if let Some(solver) = self.solver.as_mut() {
            apply_scalars(solver, &self.slots, signatures)?;
            let report = solver.solve(settings.iterations)?;
            self.iterations += u64::from(report.iterations);
        }

        let solver = self.solver.as_ref().ok_or(FormfindError::SolveBeforeInit)?;
        Ok(LiveOutput {
            iterations: self.iterations,
            constraint_count: solver.constraint_count(),
            points: solver.points().to_vec(),
            reschedule: !settings.pause,
        })
    }

    /// Disposes the solver and forgets the slots.
    pub fn stop(&mut self) -> FormfindResult<()> {
        self.slots.clear();
        self.iterations = 0;
        match self.solver.take() {
            Some(mut solver) => solver.dispose(),
            None => Ok(()),
        }
    }
}

fn build(
    signatures: &[ConstraintSignature],
    points: &[DVec3],
    settings: &LiveSettings,
) -> FormfindResult<(Solver, Vec<EditableSlot>)> {
    let mut solver = Solver::new(points.to_vec())?;
    let mut slots = Vec::new();
    for (signature, sig) in signatures.iter().enumerate() {
        let ids = solver.add_signature(sig)?;
        slots.extend(
            ids.into_iter()
                .enumerate()
                .map(|(group, id)| EditableSlot { signature, group, id }),
        );
    }
    if let Some(force) = settings.unary_force {
        solver.add_gravity_force(DVec3::from_array(force))?;
    }
    solver.initialize(settings.solve_mode())?;
    Ok((solver, slots))
}

/// Validates every slot's scalars first so a bad signature edits nothing.
fn apply_scalars(
    solver: &mut Solver,
    slots: &[EditableSlot],
    signatures: &[ConstraintSignature],
) -> FormfindResult<()> {
    let mut edits = Vec::with_capacity(slots.len());
    for slot in slots {
        let sig = signatures.get(slot.signature).ok_or_else(|| {
            FormfindError::InvalidConfig(format!(
                "signature {} is gone; reset the session to rebuild",
                slot.signature
            ))
        })?;
        if let Some(scalars) = sig.scalars_for(slot.group)? {
            let constraint = solver.constraint(slot.id)?;
            constraint
                .kind()
                .check_scalar_count(scalars.len(), constraint.indices().len())?;
            edits.push((slot.id, scalars));
        }
    }
    for (id, scalars) in edits {
        solver.edit_constraint(id, scalars)?;
    }
    Ok(())
}
