//! Error types for the formfind solver.
//!
//! All crates return `FormfindResult<T>` from fallible operations. Every
//! error is fatal to the call that raised it: the solver validates before
//! mutating, so a failed call leaves state unchanged.

use thiserror::Error;

use crate::ids::{ConstraintId, ForceId};
use crate::kind::{Arity, ConstraintKind};

/// Unified error type for the formfind solver.
#[derive(Debug, Error)]
pub enum FormfindError {
    /// Index group size does not match the kind's arity.
    #[error("{kind} constraint takes {expected} point indices, got {actual}")]
    InvalidConstraintArity {
        kind: ConstraintKind,
        expected: Arity,
        actual: usize,
    },

    /// Scalar parameter list does not match the kind's layout.
    #[error("{kind} constraint expects {expected} scalars, got {actual}")]
    InvalidScalarCount {
        kind: ConstraintKind,
        expected: String,
        actual: usize,
    },

    /// Signature scalar groups are neither one nor one-per-group.
    #[error("{kind} signature has {groups} index groups but {scalar_groups} scalar groups")]
    ScalarGroupCountMismatch {
        kind: ConstraintKind,
        groups: usize,
        scalar_groups: usize,
    },

    /// Signature weights are neither one nor one-per-group.
    #[error("{kind} signature has {groups} index groups but {weights} weights")]
    WeightCountMismatch {
        kind: ConstraintKind,
        groups: usize,
        weights: usize,
    },

    /// Weight is negative or not finite.
    #[error("{kind} constraint weight must be finite and non-negative, got {weight}")]
    InvalidWeight { kind: ConstraintKind, weight: f64 },

    /// A constraint references a point that does not exist.
    #[error("{kind} constraint references point {index}, but only {point_count} points exist")]
    PointIndexOutOfRange {
        kind: ConstraintKind,
        index: usize,
        point_count: usize,
    },

    /// A point has no constraint acting on it; the global system is singular.
    #[error("Point {index} is not referenced by any constraint")]
    UnconstrainedPoint { index: usize },

    /// `solve()` called before `initialize()`.
    #[error("Solver not initialized. Call initialize() first.")]
    SolveBeforeInit,

    /// Operation on a disposed solver.
    #[error("Solver has been disposed")]
    UseAfterDispose,

    /// Structural change attempted after `initialize()`.
    #[error("Cannot {operation} after initialize(); create a new solver instead")]
    StructureLocked { operation: &'static str },

    /// No constraint with this id.
    #[error("Unknown constraint {id}")]
    UnknownConstraint { id: ConstraintId },

    /// No force with this id (or it is not editable as requested).
    #[error("Unknown force {id}")]
    UnknownForce { id: ForceId },

    /// Wire-format kind name not recognised.
    #[error("Unknown constraint kind: {0}")]
    UnknownConstraintKind(String),

    /// Point data is malformed.
    #[error("Invalid points: {0}")]
    InvalidPoints(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sparse factorization of the global system failed.
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, FormfindError>`.
pub type FormfindResult<T> = Result<T, FormfindError>;
