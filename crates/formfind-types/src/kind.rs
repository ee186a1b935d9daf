//! Constraint kinds, their arities and scalar parameter layouts.
//!
//! The kind is a closed set validated once at construction; the solver
//! never dispatches on strings. On the wire a kind is its name
//! (`"EdgeStrain"`, `"Plane"`, ...), matching what mesh indexers emit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormfindError;

/// Every constraint kind the solver can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    EdgeStrain,
    TriangleStrain,
    TetrahedronStrain,
    Area,
    Volume,
    Bending,
    Closeness,
    Line,
    Plane,
    Circle,
    Sphere,
    Similarity,
    Rigid,
    Rectangle,
    Parallelogram,
    Laplacian,
    LaplacianDisplacement,
    #[serde(alias = "AngleConstraint")]
    Angle,
}

/// Number of point indices a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` indices.
    Exactly(usize),
    /// `n` or more indices.
    AtLeast(usize),
}

/// Layout of the scalar parameters accepted by `set_scalars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarLayout {
    /// A fixed number of scalars (zero for regression-based kinds).
    Fixed(usize),
    /// One or more candidate shapes, each `3 * point_count` coordinates.
    CandidateShapes,
}

impl ConstraintKind {
    /// All kinds, in declaration order.
    pub const ALL: [ConstraintKind; 18] = [
        ConstraintKind::EdgeStrain,
        ConstraintKind::TriangleStrain,
        ConstraintKind::TetrahedronStrain,
        ConstraintKind::Area,
        ConstraintKind::Volume,
        ConstraintKind::Bending,
        ConstraintKind::Closeness,
        ConstraintKind::Line,
        ConstraintKind::Plane,
        ConstraintKind::Circle,
        ConstraintKind::Sphere,
        ConstraintKind::Similarity,
        ConstraintKind::Rigid,
        ConstraintKind::Rectangle,
        ConstraintKind::Parallelogram,
        ConstraintKind::Laplacian,
        ConstraintKind::LaplacianDisplacement,
        ConstraintKind::Angle,
    ];

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::EdgeStrain => "EdgeStrain",
            Self::TriangleStrain => "TriangleStrain",
            Self::TetrahedronStrain => "TetrahedronStrain",
            Self::Area => "Area",
            Self::Volume => "Volume",
            Self::Bending => "Bending",
            Self::Closeness => "Closeness",
            Self::Line => "Line",
            Self::Plane => "Plane",
            Self::Circle => "Circle",
            Self::Sphere => "Sphere",
            Self::Similarity => "Similarity",
            Self::Rigid => "Rigid",
            Self::Rectangle => "Rectangle",
            Self::Parallelogram => "Parallelogram",
            Self::Laplacian => "Laplacian",
            Self::LaplacianDisplacement => "LaplacianDisplacement",
            Self::Angle => "Angle",
        }
    }

    /// Required number of point indices.
    pub fn arity(self) -> Arity {
        match self {
            Self::Closeness => Arity::Exactly(1),
            Self::EdgeStrain => Arity::Exactly(2),
            Self::TriangleStrain | Self::Area | Self::Angle => Arity::Exactly(3),
            Self::TetrahedronStrain
            | Self::Volume
            | Self::Bending
            | Self::Rectangle
            | Self::Parallelogram => Arity::Exactly(4),
            Self::Similarity | Self::Rigid => Arity::AtLeast(1),
            Self::Line | Self::Laplacian | Self::LaplacianDisplacement => Arity::AtLeast(2),
            Self::Plane | Self::Circle => Arity::AtLeast(3),
            Self::Sphere => Arity::AtLeast(4),
        }
    }

    /// Scalar parameters accepted when editing a constraint of this kind.
    pub fn scalar_layout(self) -> ScalarLayout {
        match self {
            Self::EdgeStrain | Self::Closeness => ScalarLayout::Fixed(3),
            Self::TriangleStrain
            | Self::TetrahedronStrain
            | Self::Area
            | Self::Volume
            | Self::Bending
            | Self::Angle => ScalarLayout::Fixed(2),
            Self::Similarity | Self::Rigid => ScalarLayout::CandidateShapes,
            Self::Line
            | Self::Plane
            | Self::Circle
            | Self::Sphere
            | Self::Rectangle
            | Self::Parallelogram
            | Self::Laplacian
            | Self::LaplacianDisplacement => ScalarLayout::Fixed(0),
        }
    }

    /// Checks an index-group size against this kind's arity.
    pub fn check_arity(self, actual: usize) -> Result<(), FormfindError> {
        if self.arity().accepts(actual) {
            Ok(())
        } else {
            Err(FormfindError::InvalidConstraintArity {
                kind: self,
                expected: self.arity(),
                actual,
            })
        }
    }

    /// Checks a scalar list length for a constraint over `point_count` points.
    pub fn check_scalar_count(self, actual: usize, point_count: usize) -> Result<(), FormfindError> {
        let layout = self.scalar_layout();
        if layout.accepts(actual, point_count) {
            Ok(())
        } else {
            Err(FormfindError::InvalidScalarCount {
                kind: self,
                expected: layout.describe(point_count),
                actual,
            })
        }
    }
}

impl Arity {
    /// Returns true if `count` indices satisfy this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl ScalarLayout {
    /// Returns true if `count` scalars fit this layout for `point_count` points.
    pub fn accepts(self, count: usize, point_count: usize) -> bool {
        match self {
            ScalarLayout::Fixed(n) => count == n,
            ScalarLayout::CandidateShapes => {
                let block = 3 * point_count;
                block > 0 && count >= block && count % block == 0
            }
        }
    }

    /// Human-readable expectation, used in error messages.
    pub fn describe(self, point_count: usize) -> String {
        match self {
            ScalarLayout::Fixed(n) => n.to_string(),
            ScalarLayout::CandidateShapes => format!("a positive multiple of {}", 3 * point_count),
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

impl FromStr for ConstraintKind {
    type Err = FormfindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "AngleConstraint" {
            return Ok(Self::Angle);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| FormfindError::UnknownConstraintKind(s.to_string()))
    }
}
