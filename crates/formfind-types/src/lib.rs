//! # formfind-types
//!
//! Shared types, identifiers, error types, and numeric constants
//! for the formfind constraint solver.
//!
//! This crate has zero solver logic: it defines the vocabulary
//! that the math and solver crates share.

pub mod constants;
pub mod error;
pub mod ids;
pub mod kind;
pub mod scalar;

pub use error::{FormfindError, FormfindResult};
pub use ids::{ConstraintId, ForceId};
pub use kind::{Arity, ConstraintKind, ScalarLayout};
pub use scalar::Scalar;
