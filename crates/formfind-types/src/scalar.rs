//! Scalar type alias for the solver.
//!
//! Shape optimization accumulates many small corrections over hundreds of
//! iterations, so the solver works in double precision throughout.

/// The floating-point type used throughout the solver.
pub type Scalar = f64;
