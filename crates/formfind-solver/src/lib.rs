//! # formfind-solver
//!
//! Projection-based local/global constraint solving over a point set.
//!
//! ## Key Types
//!
//! - [`Solver`]: constraint/force collection, factorised global system,
//!   static or dynamic iteration loop
//! - [`Constraint`]: one geometric rule, as operator rows plus a local
//!   projection (18 kinds, see [`constraint`])
//! - [`ConstraintSignature`]: serialisable batch of constraints of one kind
//! - [`RuntimeSettings`]: static/live settings, as read from the host
//! - [`LiveSession`]: caller-owned solver driven step by step
//!
//! ```no_run
//! use formfind_solver::{ConstraintKind, Solver, SolveMode};
//! use formfind_solver::DVec3;
//!
//! # fn main() -> formfind_solver::FormfindResult<()> {
//! let mut solver = Solver::new(vec![DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0)])?;
//! let edge = solver.add_constraint(ConstraintKind::EdgeStrain, vec![0, 1], 1.0)?;
//! solver.edit_constraint(edge, &[1.0, 1.0, 1.0])?;
//! solver.add_constraint(ConstraintKind::Closeness, vec![0], 1.0)?;
//! solver.initialize(SolveMode::Static)?;
//! solver.solve(50)?;
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod config;
pub mod constraint;
pub mod force;
pub mod points;
pub mod session;
pub mod signature;
pub mod solver;
pub mod state;

pub use config::{Dynamics, LiveSettings, RuntimeSettings, SolveMode, StaticSettings};
pub use constraint::Constraint;
pub use force::{Force, GravityForce, VertexForce};
pub use formfind_math::DVec3;
pub use formfind_types::{ConstraintId, ConstraintKind, FormfindError, FormfindResult, ForceId};
pub use points::PointStore;
pub use session::{run_static, EditableSlot, LiveOutput, LiveSession, SolveOutput};
pub use signature::{ConstraintSignature, ConstraintSpec};
pub use solver::{Phase, SolveReport, Solver};
pub use state::DynamicState;
