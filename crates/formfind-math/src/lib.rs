//! # formfind-math
//!
//! Linear algebra primitives for the formfind solver.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3`, `DMat3`, etc.)
//! - 3×2 matrix type for triangle frames and strain gradients
//! - Small dense decompositions (SVD, Procrustes, least-squares fits)
//! - Sparse matrix representation (CSR) and Cholesky solver interface

pub mod decomposition;
pub mod faer_solver;
pub mod fit;
pub mod mat3x2;
pub mod sparse;

// Re-export glam types as the canonical math types for formfind.
pub use glam::{DMat2, DMat3, DVec2, DVec3};
