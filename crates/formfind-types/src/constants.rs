//! Numeric constants and solver defaults.

/// Default number of local/global iterations for a static run.
pub const DEFAULT_STATIC_ITERATIONS: u32 = 50;

/// Default number of local/global iterations per live invocation.
pub const DEFAULT_LIVE_ITERATIONS: u32 = 5;

/// Default point mass for dynamic solves.
pub const DEFAULT_MASS: f64 = 1.0;

/// Default velocity retention factor for dynamic solves (1.0 = undamped).
pub const DEFAULT_DAMPING: f64 = 1.0;

/// Default time step for dynamic solves.
pub const DEFAULT_TIME_STEP: f64 = 0.1;

/// Epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1.0e-12;

/// Lengths, areas and curvature norms below this are treated as degenerate.
pub const DEGENERATE_THRESHOLD: f64 = 1.0e-6;

/// Newton-style correction rounds used by the area and volume projections.
pub const SINGULAR_VALUE_CORRECTION_ROUNDS: usize = 5;

/// Relative residual gap below which two candidate shapes count as a tie.
pub const CANDIDATE_TIE_TOLERANCE: f64 = 1.0e-9;

/// Alternating fit rounds used by the rectangle projection.
pub const RECTANGLE_FIT_ROUNDS: usize = 8;
