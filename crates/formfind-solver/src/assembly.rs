//! Global system assembly.
//!
//! Builds the constant operator `A` by stacking every constraint's
//! weighted rows, and the system matrix `AᵀA + (M/h²)·I` that is
//! factorised once at initialisation:
//! - `A` is R×N, one row block per constraint, in insertion order
//! - `M/h²` is zero for static solves
//!
//! The right-hand side changes every iteration:
//! `Aᵀ·proj + (M/h²)·momentum`, solved for X, Y and Z at once.

use formfind_math::sparse::CsrMatrix;
use formfind_math::DVec3;
use formfind_types::constants::EPSILON;

use crate::constraint::Constraint;

/// The stacked weighted operator, one row block per constraint.
#[derive(Debug, Clone)]
pub struct Operator {
    pub matrix: CsrMatrix,
}

impl Operator {
    pub fn rows(&self) -> usize {
        self.matrix.rows
    }
}

/// Stack all constraints' weighted operator rows into one R×N matrix.
pub fn assemble_operator(n: usize, constraints: &[Box<dyn Constraint>]) -> Operator {
    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut row = 0;
    for c in constraints {
        c.add_to_system(row, &mut triplets);
        row += c.rows();
    }

    Operator {
        matrix: CsrMatrix::from_triplets(row, n, &triplets),
    }
}

/// System matrix `AᵀA + inertia·I`.
pub fn assemble_system_matrix(operator: &Operator, inertia: f64) -> CsrMatrix {
    operator.matrix.normal_matrix(inertia)
}

/// Right-hand side `Aᵀ·projections (+ inertia·momentum)`.
pub fn assemble_rhs(
    operator: &Operator,
    projections: &[DVec3],
    inertia: f64,
    momentum: Option<&[DVec3]>,
) -> Vec<DVec3> {
    let mut rhs = operator.matrix.transpose_mul(projections);
    if let Some(momentum) = momentum {
        for (r, m) in rhs.iter_mut().zip(momentum) {
            *r += *m * inertia;
        }
    }
    rhs
}

/// Number of constraints referencing each point.
pub fn reference_counts(n: usize, constraints: &[Box<dyn Constraint>]) -> Vec<usize> {
    let mut counts = vec![0; n];
    for c in constraints {
        for &i in c.indices() {
            counts[i] += 1;
        }
    }
    counts
}

/// First cluster of points the static system cannot hold in place.
///
/// Points are clustered through constraints of positive weight. A cluster
/// is pinned when one of its constraints has an operator row whose
/// coefficients do not sum to zero (e.g. Closeness); difference and
/// mean-centred rows leave the cluster free to translate, which makes
/// `AᵀA` singular. Returns the cluster's point indices, ascending.
pub fn free_cluster(n: usize, constraints: &[Box<dyn Constraint>]) -> Option<Vec<usize>> {
    let active: Vec<&dyn Constraint> = constraints
        .iter()
        .map(|c| &**c)
        .filter(|c| c.weight() > 0.0)
        .collect();

    let mut parent: Vec<usize> = (0..n).collect();
    for c in &active {
        if let Some((&first, rest)) = c.indices().split_first() {
            for &j in rest {
                let a = find_root(&mut parent, first);
                let b = find_root(&mut parent, j);
                parent[a] = b;
            }
        }
    }

    let mut pinned = vec![false; n];
    for c in active.iter().filter(|c| anchors_translation(**c)) {
        if let Some(&i) = c.indices().first() {
            let root = find_root(&mut parent, i);
            pinned[root] = true;
        }
    }

    let roots: Vec<usize> = (0..n).map(|i| find_root(&mut parent, i)).collect();
    let free = roots.iter().copied().find(|&r| !pinned[r])?;
    Some((0..n).filter(|&i| roots[i] == free).collect())
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Whether some operator row of `c` moves under a uniform translation.
fn anchors_translation(c: &dyn Constraint) -> bool {
    let mut sums = vec![0.0; c.rows()];
    for (row, _, v) in c.stencil() {
        sums[row] += v;
    }
    sums.iter().any(|s| s.abs() > EPSILON)
}
