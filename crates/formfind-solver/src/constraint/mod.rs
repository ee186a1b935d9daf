//! Constraints: the local half of the local/global iteration.
//!
//! Every constraint owns a small linear operator `S` over the points it
//! references (its *stencil*) and a projection that maps the current
//! positions to the nearest configuration satisfying the constraint,
//! expressed in the operator's row space. The solver assembles
//! `A = Σ w·S` once; each iteration it asks every constraint for its
//! projection and solves `AᵀA p = Aᵀ r` (plus inertia in dynamic mode).
//!
//! Kinds are grouped by how their operator is built:
//! - [`strain`]: edge/triangle/tetrahedron deformation gradients
//!   (EdgeStrain, TriangleStrain, TetrahedronStrain, Area, Volume)
//! - [`bending`]: cotangent mean-curvature stencil on an edge's two faces
//! - [`closeness`]: a single point pulled toward a stored position
//! - [`regression`]: mean-centred fits (Line, Plane, Circle, Sphere)
//! - [`shape`]: mean-centred shape matching (Similarity, Rigid,
//!   Rectangle, Parallelogram)
//! - [`laplacian`]: umbrella operator (Laplacian, LaplacianDisplacement)
//! - [`angle`]: corner angle between two edges

pub mod angle;
pub mod bending;
pub mod closeness;
pub mod laplacian;
pub mod regression;
pub mod shape;
pub mod strain;

use formfind_math::decomposition::least_change_targets;
use formfind_math::DVec3;
use formfind_types::{ConstraintKind, FormfindError, FormfindResult};

/// One operator entry: `(row, slot, coefficient)`, where `slot` indexes
/// into the constraint's own point list.
pub type StencilEntry = (usize, usize, f64);

/// A projection constraint over a fixed set of points.
pub trait Constraint: Send + Sync {
    fn kind(&self) -> ConstraintKind;

    /// Global point indices, in the order the kind expects.
    fn indices(&self) -> &[usize];

    fn weight(&self) -> f64;

    /// Rows this constraint contributes to the global operator.
    fn rows(&self) -> usize;

    /// Unweighted operator `S` in local coordinates.
    fn stencil(&self) -> Vec<StencilEntry>;

    /// Writes the projection target `r` (one vector per row, unweighted)
    /// for the current global positions into `out`.
    fn project(&self, positions: &[DVec3], out: &mut [DVec3]);

    /// Current scalar parameters, in the layout `set_scalars` accepts.
    fn scalars(&self) -> Vec<f64>;

    /// Replaces the scalar parameters. Rejected lists leave the
    /// constraint unchanged.
    fn set_scalars(&mut self, scalars: &[f64]) -> FormfindResult<()>;

    /// Weighted operator rows as global triplets, starting at `first_row`.
    fn add_to_system(&self, first_row: usize, triplets: &mut Vec<(usize, usize, f64)>) {
        let w = self.weight();
        let indices = self.indices();
        triplets.extend(
            self.stencil()
                .into_iter()
                .map(|(row, slot, v)| (first_row + row, indices[slot], w * v)),
        );
    }

    /// Positions of the referenced points that would satisfy the
    /// constraint with the least movement.
    fn local_targets(&self, positions: &[DVec3]) -> Vec<DVec3> {
        let current = gather(positions, self.indices());
        let mut targets = vec![DVec3::ZERO; self.rows()];
        self.project(positions, &mut targets);
        least_change_targets(self.rows(), &self.stencil(), &current, &targets)
    }

    /// Squared residual `‖S p − r‖²`; zero when the constraint is satisfied.
    fn error(&self, positions: &[DVec3]) -> f64 {
        let mut targets = vec![DVec3::ZERO; self.rows()];
        self.project(positions, &mut targets);
        let applied = apply_stencil(&self.stencil(), self.rows(), self.indices(), positions);
        applied
            .iter()
            .zip(&targets)
            .map(|(a, r)| (*a - *r).length_squared())
            .sum()
    }
}

/// Builds a constraint of `kind` over `indices`, capturing its rest state
/// from `positions`.
pub fn build_constraint(
    kind: ConstraintKind,
    indices: Vec<usize>,
    weight: f64,
    positions: &[DVec3],
) -> FormfindResult<Box<dyn Constraint>> {
    kind.check_arity(indices.len())?;
    validate_weight(kind, weight)?;
    validate_indices(kind, &indices, positions.len())?;

    let constraint: Box<dyn Constraint> = match kind {
        ConstraintKind::EdgeStrain => Box::new(strain::EdgeStrain::new(indices, weight, positions)),
        ConstraintKind::TriangleStrain | ConstraintKind::Area => {
            Box::new(strain::TriangleStrain::new(kind, indices, weight, positions))
        }
        ConstraintKind::TetrahedronStrain | ConstraintKind::Volume => {
            Box::new(strain::TetrahedronStrain::new(kind, indices, weight, positions))
        }
        ConstraintKind::Bending => Box::new(bending::Bending::new(indices, weight, positions)),
        ConstraintKind::Closeness => {
            Box::new(closeness::Closeness::new(indices, weight, positions))
        }
        ConstraintKind::Line
        | ConstraintKind::Plane
        | ConstraintKind::Circle
        | ConstraintKind::Sphere => Box::new(regression::Regression::new(kind, indices, weight)),
        ConstraintKind::Similarity | ConstraintKind::Rigid => {
            Box::new(shape::ShapeMatch::new(kind, indices, weight, positions))
        }
        ConstraintKind::Rectangle => Box::new(shape::Rectangle::new(indices, weight)),
        ConstraintKind::Parallelogram => Box::new(shape::Parallelogram::new(indices, weight)),
        ConstraintKind::Laplacian | ConstraintKind::LaplacianDisplacement => {
            Box::new(laplacian::Laplacian::new(kind, indices, weight, positions))
        }
        ConstraintKind::Angle => Box::new(angle::Angle::new(indices, weight)),
    };
    Ok(constraint)
}

/// Weights must be finite and non-negative.
pub fn validate_weight(kind: ConstraintKind, weight: f64) -> FormfindResult<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(FormfindError::InvalidWeight { kind, weight })
    }
}

/// Every index must name an existing point.
pub fn validate_indices(
    kind: ConstraintKind,
    indices: &[usize],
    point_count: usize,
) -> FormfindResult<()> {
    match indices.iter().find(|&&i| i >= point_count) {
        Some(&index) => Err(FormfindError::PointIndexOutOfRange {
            kind,
            index,
            point_count,
        }),
        None => Ok(()),
    }
}

/// Positions of `indices`, in order.
pub(crate) fn gather(positions: &[DVec3], indices: &[usize]) -> Vec<DVec3> {
    indices.iter().map(|&i| positions[i]).collect()
}

/// `S p` for a local stencil.
pub(crate) fn apply_stencil(
    stencil: &[StencilEntry],
    rows: usize,
    indices: &[usize],
    positions: &[DVec3],
) -> Vec<DVec3> {
    let mut out = vec![DVec3::ZERO; rows];
    for &(row, slot, v) in stencil {
        out[row] += positions[indices[slot]] * v;
    }
    out
}

/// `v` limited to `[lo, hi]`; never panics on an inverted range.
#[inline]
pub(crate) fn clamp_range(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Operator `δᵢⱼ − 1/n`: removes the mean of the referenced points.
pub(crate) fn mean_centred_stencil(n: usize) -> Vec<StencilEntry> {
    let inv = 1.0 / n as f64;
    let mut entries = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let delta = if i == j { 1.0 } else { 0.0 };
            entries.push((i, j, delta - inv));
        }
    }
    entries
}

/// Referenced positions with their centroid removed.
pub(crate) fn centred(positions: &[DVec3], indices: &[usize]) -> Vec<DVec3> {
    let mut pts = gather(positions, indices);
    let mean = pts.iter().copied().sum::<DVec3>() / pts.len().max(1) as f64;
    for p in &mut pts {
        *p -= mean;
    }
    pts
}

/// Writes `targets` into `out` with their centroid removed, keeping the
/// projection inside the range of the mean-centring operator.
pub(crate) fn write_centred(targets: &[DVec3], out: &mut [DVec3]) {
    let mean = targets.iter().copied().sum::<DVec3>() / targets.len().max(1) as f64;
    for (o, t) in out.iter_mut().zip(targets) {
        *o = *t - mean;
    }
}

/// Shared `set_scalars` for kinds with a fixed `[min, max]` range pair.
pub(crate) fn set_range(
    kind: ConstraintKind,
    point_count: usize,
    scalars: &[f64],
    range: &mut (f64, f64),
) -> FormfindResult<()> {
    kind.check_scalar_count(scalars.len(), point_count)?;
    *range = (scalars[0], scalars[1]);
    Ok(())
}

/// `set_scalars` for kinds without scalar parameters.
pub(crate) fn set_none(
    kind: ConstraintKind,
    point_count: usize,
    scalars: &[f64],
) -> FormfindResult<()> {
    kind.check_scalar_count(scalars.len(), point_count)
}
