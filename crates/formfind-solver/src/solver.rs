//! Local/global projection solver.
//!
//! Implements the iteration loop:
//! 1. **Predict** (dynamic only): momentum `p + v·h + f·h²/m`
//! 2. **Local step**: every constraint projects the current positions
//!    onto its own feasible set, in parallel
//! 3. **Global step**: solve the constant SPD system
//!    `(M/h² + AᵀA) p = M/h²·momentum + Aᵀ·proj`
//! 4. **Repeat** steps 2–3 for the requested number of iterations
//! 5. **Finalize** (dynamic only): velocities from the position change
//!
//! The system matrix is factorised once in [`Solver::initialize`] and
//! reused by every iteration; only the right-hand side changes.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──add_constraint / add_force──▶ Created
//! Created ──initialize──▶ Initialized ──solve / edit──▶ Initialized
//! any ──dispose──▶ Disposed
//! ```

use std::time::Instant;

use formfind_math::faer_solver::FaerSolver;
use formfind_math::sparse::SparseSolver;
use formfind_math::DVec3;
use formfind_types::{ConstraintId, ConstraintKind, FormfindError, FormfindResult, ForceId};
use rayon::prelude::*;

use crate::assembly::{
    assemble_operator, assemble_rhs, assemble_system_matrix, free_cluster, reference_counts,
    Operator,
};
use crate::config::{validate_damping, validate_time_step, Dynamics, SolveMode};
use crate::constraint::{build_constraint, Constraint};
use crate::force::{Force, GravityForce, VertexForce};
use crate::points::PointStore;
use crate::state::DynamicState;

/// Where a solver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting constraints and forces.
    Created,
    /// Global system factorised; ready to solve.
    Initialized,
    /// Factorisation released; only `points()` still works.
    Disposed,
}

/// Result of one `solve()` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Local/global iterations performed.
    pub iterations: u32,
    /// Relative position change `‖Δp‖ / ‖p‖` of the last iteration.
    pub residual: f64,
    /// Wall-clock time for the call (seconds).
    pub wall_time: f64,
}

/// Factorised global system plus the projection buffer it consumes.
struct GlobalSystem {
    operator: Operator,
    linear: FaerSolver,
    /// One row per operator row, filled by the local step.
    projections: Vec<DVec3>,
    /// `m / h²`, zero for static solves.
    inertia: f64,
}

impl GlobalSystem {
    fn build(operator: Operator, inertia: f64) -> FormfindResult<Self> {
        let matrix = assemble_system_matrix(&operator, inertia);
        let mut linear = FaerSolver::new();
        linear.factorize(&matrix).map_err(|e| {
            FormfindError::Factorization(format!(
                "sparse Cholesky of the {}×{} global system failed: {e}",
                matrix.rows, matrix.cols
            ))
        })?;
        let projections = vec![DVec3::ZERO; operator.rows()];
        Ok(Self {
            operator,
            linear,
            projections,
            inertia,
        })
    }
}

/// Projection-based constraint solver over an owned point set.
pub struct Solver {
    points: PointStore,
    constraints: Vec<Box<dyn Constraint>>,
    forces: Vec<Box<dyn Force>>,
    phase: Phase,
    mode: SolveMode,
    system: Option<GlobalSystem>,
    dynamic: Option<DynamicState>,
    iterations: u64,
}

impl Solver {
    /// Creates a solver over a copy of `points`.
    pub fn new(points: Vec<DVec3>) -> FormfindResult<Self> {
        Ok(Self {
            points: PointStore::new(points)?,
            constraints: Vec::new(),
            forces: Vec::new(),
            phase: Phase::Created,
            mode: SolveMode::Static,
            system: None,
            dynamic: None,
            iterations: 0,
        })
    }

    /// Creates a solver from a flat `[x0, y0, z0, x1, ...]` buffer.
    pub fn from_flat(coords: &[f64]) -> FormfindResult<Self> {
        let store = PointStore::from_flat(coords)?;
        Self::new(store.get_all())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> SolveMode {
        self.mode
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    /// Total local/global iterations run so far.
    pub fn iteration_count(&self) -> u64 {
        self.iterations
    }

    fn ensure_alive(&self) -> FormfindResult<()> {
        match self.phase {
            Phase::Disposed => Err(FormfindError::UseAfterDispose),
            _ => Ok(()),
        }
    }

    pub(crate) fn ensure_unlocked(&self, operation: &'static str) -> FormfindResult<()> {
        match self.phase {
            Phase::Created => Ok(()),
            Phase::Initialized => Err(FormfindError::StructureLocked { operation }),
            Phase::Disposed => Err(FormfindError::UseAfterDispose),
        }
    }

    // ─── Constraints ─────────────────────────────────────────

    /// Adds a constraint over `indices`, capturing its rest state from the
    /// current positions. Returns its insertion index.
    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        indices: Vec<usize>,
        weight: f64,
    ) -> FormfindResult<ConstraintId> {
        self.try_add_constraint(kind, indices, weight)
            .inspect_err(|e| tracing::warn!(error = %e, "add_constraint rejected"))
    }

    fn try_add_constraint(
        &mut self,
        kind: ConstraintKind,
        indices: Vec<usize>,
        weight: f64,
    ) -> FormfindResult<ConstraintId> {
        self.ensure_unlocked("add a constraint")?;
        let constraint = build_constraint(kind, indices, weight, self.points.as_slice())?;
        Ok(self.push_constraint(constraint))
    }

    pub(crate) fn push_constraint(&mut self, constraint: Box<dyn Constraint>) -> ConstraintId {
        let id = ConstraintId(self.constraints.len() as u32);
        tracing::debug!(
            id = id.0,
            kind = %constraint.kind(),
            points = constraint.indices().len(),
            weight = constraint.weight(),
            "constraint_added"
        );
        self.constraints.push(constraint);
        id
    }

    /// Replaces a constraint's scalar parameters. Takes effect at the next
    /// projection; a rejected list leaves the constraint unchanged.
    pub fn edit_constraint(&mut self, id: ConstraintId, scalars: &[f64]) -> FormfindResult<()> {
        self.try_edit_constraint(id, scalars)
            .inspect_err(|e| tracing::warn!(error = %e, "edit_constraint rejected"))
    }

    fn try_edit_constraint(&mut self, id: ConstraintId, scalars: &[f64]) -> FormfindResult<()> {
        self.ensure_alive()?;
        let constraint = self
            .constraints
            .get_mut(id.index())
            .ok_or(FormfindError::UnknownConstraint { id })?;
        constraint.set_scalars(scalars)
    }

    pub fn constraint(&self, id: ConstraintId) -> FormfindResult<&dyn Constraint> {
        self.ensure_alive()?;
        self.constraints
            .get(id.index())
            .map(|c| c.as_ref())
            .ok_or(FormfindError::UnknownConstraint { id })
    }

    /// Squared residual of one constraint at the current positions.
    pub fn constraint_error(&self, id: ConstraintId) -> FormfindResult<f64> {
        let c = self.constraint(id)?;
        Ok(c.error(self.points.as_slice()))
    }

    /// Positions of a constraint's points implied by its projection.
    pub fn local_targets(&self, id: ConstraintId) -> FormfindResult<Vec<DVec3>> {
        let c = self.constraint(id)?;
        Ok(c.local_targets(self.points.as_slice()))
    }

    /// Sum of every constraint's squared residual.
    pub fn total_error(&self) -> FormfindResult<f64> {
        self.ensure_alive()?;
        let positions = self.points.as_slice();
        Ok(self.constraints.par_iter().map(|c| c.error(positions)).sum())
    }

    // ─── Forces ──────────────────────────────────────────────

    /// Adds a force law. Forces only act in dynamic mode.
    pub fn add_force<F: Force + 'static>(&mut self, force: F) -> FormfindResult<ForceId> {
        self.ensure_unlocked("add a force")
            .inspect_err(|e| tracing::warn!(error = %e, "add_force rejected"))?;
        let id = ForceId(self.forces.len() as u32);
        self.forces.push(Box::new(force));
        tracing::debug!(id = id.0, "force_added");
        Ok(id)
    }

    /// Adds the same force vector on every point.
    pub fn add_gravity_force(&mut self, force: DVec3) -> FormfindResult<ForceId> {
        self.add_force(GravityForce::new(force))
    }

    /// Adds a force on a single point.
    pub fn add_vertex_force(&mut self, force: DVec3, index: usize) -> FormfindResult<ForceId> {
        self.check_point(index)?;
        self.add_force(VertexForce::new(force, index))
    }

    /// Changes the vector and target point of a vertex force.
    pub fn edit_vertex_force(
        &mut self,
        id: ForceId,
        force: DVec3,
        index: usize,
    ) -> FormfindResult<()> {
        self.ensure_alive()?;
        self.check_point(index)?;
        let vertex = self
            .forces
            .get_mut(id.index())
            .and_then(|f| f.as_vertex_force_mut())
            .ok_or(FormfindError::UnknownForce { id })?;
        vertex.force = force;
        vertex.index = index;
        Ok(())
    }

    fn check_point(&self, index: usize) -> FormfindResult<()> {
        if index < self.points.len() {
            Ok(())
        } else {
            Err(FormfindError::InvalidPoints(format!(
                "force targets point {index}, but only {} points exist",
                self.points.len()
            )))
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Builds and factorises the global system.
    ///
    /// Fails without changing state if a point is referenced by no
    /// constraint, the dynamics are invalid, a static cluster has nothing
    /// anchoring it against translation, or the factorisation fails.
    /// Calling it again on an initialised solver rebuilds the system
    /// (e.g. to switch modes); velocities restart at rest.
    pub fn initialize(&mut self, mode: SolveMode) -> FormfindResult<()> {
        self.try_initialize(mode)
            .inspect_err(|e| tracing::warn!(error = %e, "initialize rejected"))
    }

    fn try_initialize(&mut self, mode: SolveMode) -> FormfindResult<()> {
        self.ensure_alive()?;
        let n = self.points.len();
        if n == 0 {
            return Err(FormfindError::InvalidPoints("solver has no points".into()));
        }
        if let SolveMode::Dynamic(dynamics) = mode {
            dynamics.validate()?;
        }

        let counts = reference_counts(n, &self.constraints);
        if let Some(index) = counts.iter().position(|&c| c == 0) {
            return Err(FormfindError::UnconstrainedPoint { index });
        }
        // Inertia pins every point in dynamic mode; static solves need an anchor.
        if !mode.is_dynamic() {
            if let Some(cluster) = free_cluster(n, &self.constraints) {
                return Err(FormfindError::Factorization(format!(
                    "{} point(s) starting at index {} can translate freely; \
                     add a constraint that anchors them (e.g. Closeness)",
                    cluster.len(),
                    cluster[0]
                )));
            }
        }

        let operator = assemble_operator(n, &self.constraints);
        let inertia = match mode {
            SolveMode::Dynamic(dynamics) => dynamics.inertia(),
            SolveMode::Static => 0.0,
        };
        let system = GlobalSystem::build(operator, inertia)?;

        tracing::info!(
            points = n,
            constraints = self.constraints.len(),
            rows = system.operator.rows(),
            nnz = system.operator.matrix.nnz(),
            dynamic = mode.is_dynamic(),
            "solver_initialized"
        );

        self.dynamic = match mode {
            SolveMode::Dynamic(dynamics) => {
                Some(DynamicState::new(self.points.as_slice(), dynamics))
            }
            SolveMode::Static => None,
        };
        self.system = Some(system);
        self.mode = mode;
        self.phase = Phase::Initialized;
        Ok(())
    }

    /// Runs `iterations` local/global passes. In dynamic mode the call is
    /// one time step: forces and momentum are computed once up front and
    /// velocities are updated at the end.
    pub fn solve(&mut self, iterations: u32) -> FormfindResult<SolveReport> {
        let system = match self.phase {
            Phase::Disposed => Err(FormfindError::UseAfterDispose),
            Phase::Created => Err(FormfindError::SolveBeforeInit),
            Phase::Initialized => self.system.as_mut().ok_or(FormfindError::SolveBeforeInit),
        }
        .inspect_err(|e| tracing::warn!(error = %e, "solve rejected"))?;

        let start = Instant::now();
        let positions = self.points.as_mut_slice();

        if iterations == 0 {
            return Ok(SolveReport {
                iterations: 0,
                residual: 0.0,
                wall_time: 0.0,
            });
        }

        if let Some(state) = self.dynamic.as_mut() {
            state.accumulate_forces(positions, &self.forces);
            state.predict(positions);
        }

        let mut next = vec![DVec3::ZERO; positions.len()];
        let mut residual = 0.0;
        for _ in 0..iterations {
            local_step(&self.constraints, positions, &mut system.projections);

            let momentum = self.dynamic.as_ref().map(|s| s.momentum.as_slice());
            let rhs = assemble_rhs(&system.operator, &system.projections, system.inertia, momentum);
            system
                .linear
                .solve(&rhs, &mut next)
                .map_err(FormfindError::Factorization)?;

            residual = relative_change(positions, &next);
            positions.copy_from_slice(&next);
        }

        if let Some(state) = self.dynamic.as_mut() {
            state.update_velocities(positions);
        }
        self.iterations += u64::from(iterations);

        let wall_time = start.elapsed().as_secs_f64();
        tracing::info!(iterations, residual, wall_time, "solve_complete");

        Ok(SolveReport {
            iterations,
            residual,
            wall_time,
        })
    }

    /// Current positions. Still readable after `dispose()`.
    pub fn points(&self) -> &[DVec3] {
        self.points.as_slice()
    }

    /// Current positions as `[x0, y0, z0, x1, ...]`.
    pub fn points_flat(&self) -> Vec<f64> {
        self.points.to_flat()
    }

    /// Overwrites all positions (same count). Dynamic velocities restart
    /// at rest. Constraint rest states are not recaptured.
    pub fn set_points(&mut self, positions: &[DVec3]) -> FormfindResult<()> {
        self.ensure_alive()?;
        self.points.set_all(positions)?;
        if let Some(state) = self.dynamic.as_mut() {
            state.reset_velocities(self.points.as_slice());
        }
        Ok(())
    }

    /// Changes the velocity retention factor of a dynamic solve.
    pub fn set_damping(&mut self, damping: f64) -> FormfindResult<()> {
        self.ensure_alive()?;
        validate_damping(damping)?;
        let state = self.dynamic.as_mut().ok_or_else(not_dynamic)?;
        state.dynamics.damping = damping;
        self.mode = SolveMode::Dynamic(state.dynamics);
        Ok(())
    }

    /// Changes the time step of a dynamic solve and re-factorises the
    /// system, whose diagonal depends on it.
    pub fn set_time_step(&mut self, time_step: f64) -> FormfindResult<()> {
        self.ensure_alive()?;
        validate_time_step(time_step)?;
        let (Some(state), Some(system)) = (self.dynamic.as_mut(), self.system.as_mut()) else {
            return Err(not_dynamic());
        };

        let dynamics = Dynamics {
            time_step,
            ..state.dynamics
        };
        let rebuilt = GlobalSystem::build(system.operator.clone(), dynamics.inertia())?;
        *system = rebuilt;
        state.dynamics = dynamics;
        self.mode = SolveMode::Dynamic(dynamics);
        tracing::debug!(time_step, "time_step_changed");
        Ok(())
    }

    /// Kinetic energy of a dynamic solve, `None` in static mode.
    pub fn kinetic_energy(&self) -> Option<f64> {
        self.dynamic.as_ref().map(DynamicState::kinetic_energy)
    }

    /// Releases the factorisation and dynamic buffers. Every later call
    /// except `points()` fails with `UseAfterDispose`.
    pub fn dispose(&mut self) -> FormfindResult<()> {
        self.ensure_alive()?;
        if let Some(mut system) = self.system.take() {
            system.linear.release();
        }
        self.dynamic = None;
        self.phase = Phase::Disposed;
        tracing::debug!("solver_disposed");
        Ok(())
    }
}

fn not_dynamic() -> FormfindError {
    FormfindError::InvalidConfig("solver is not initialized for dynamic solves".into())
}

/// Projects every constraint into its own slice of `projections`, scaled
/// by the constraint weight to match the rows of `A`.
fn local_step(
    constraints: &[Box<dyn Constraint>],
    positions: &[DVec3],
    projections: &mut [DVec3],
) {
    let mut slices: Vec<&mut [DVec3]> = Vec::with_capacity(constraints.len());
    let mut rest = projections;
    for c in constraints {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(c.rows());
        slices.push(head);
        rest = tail;
    }

    slices
        .into_par_iter()
        .zip(constraints.par_iter())
        .for_each(|(out, c)| {
            c.project(positions, out);
            let w = c.weight();
            for o in out.iter_mut() {
                *o *= w;
            }
        });
}

/// `‖next − current‖ / ‖current‖`, guarded for a zero-norm state.
fn relative_change(current: &[DVec3], next: &[DVec3]) -> f64 {
    let mut diff = 0.0;
    let mut norm = 0.0;
    for (a, b) in current.iter().zip(next) {
        diff += (*b - *a).length_squared();
        norm += a.length_squared();
    }
    if norm > 0.0 {
        (diff / norm).sqrt()
    } else {
        diff.sqrt()
    }
}
