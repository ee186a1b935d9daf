//! Prefactorised sparse Cholesky for the global step, backed by `faer`.
//!
//! The global matrix `AᵀA + (m/h²)·I` is fixed once the constraint set is
//! known, so [`FaerSolver::factorize`] runs the symbolic analysis and the
//! numeric LLᵀ a single time and every local/global iteration only pays
//! for the triangular solves of its three right-hand sides (x, y, z).

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::{SparseColMat, Triplet};
use faer::{Mat, Side};
use glam::DVec3;

use crate::sparse::{CsrMatrix, SparseSolver};

/// Cached LLᵀ factor of an N×N SPD matrix.
#[derive(Default)]
pub struct FaerSolver {
    factor: Option<Factor>,
}

struct Factor {
    llt: Llt<usize, f64>,
    n: usize,
}

impl FaerSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// N of the factorised system, 0 before `factorize` or after `release`.
    pub fn dimension(&self) -> usize {
        self.factor.as_ref().map_or(0, |f| f.n)
    }
}

/// Re-expresses the CSR matrix as faer column storage.
fn to_csc(matrix: &CsrMatrix) -> Result<SparseColMat<usize, f64>, String> {
    let entries: Vec<Triplet<usize, usize, f64>> = (0..matrix.rows)
        .flat_map(|row| {
            (matrix.row_ptr[row]..matrix.row_ptr[row + 1])
                .map(move |k| Triplet {
                    row,
                    col: matrix.col_idx[k],
                    val: matrix.values[k],
                })
        })
        .collect();
    SparseColMat::try_new_from_triplets(matrix.rows, matrix.cols, &entries)
        .map_err(|e| format!("invalid sparse structure: {e:?}"))
}

impl SparseSolver for FaerSolver {
    fn factorize(&mut self, matrix: &CsrMatrix) -> Result<(), String> {
        // Never keep a factor of a previous matrix around on failure.
        self.factor = None;

        let n = matrix.rows;
        if n != matrix.cols {
            return Err(format!("system matrix is {}×{}, not square", n, matrix.cols));
        }
        if n == 0 {
            return Err("system matrix is empty".into());
        }

        let csc = to_csc(matrix)?;
        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
            .map_err(|e| format!("symbolic analysis: {e:?}"))?;
        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper)
            .map_err(|e| format!("matrix is not positive definite: {e:?}"))?;

        self.factor = Some(Factor { llt, n });
        Ok(())
    }

    fn solve(&self, rhs: &[DVec3], solution: &mut [DVec3]) -> Result<(), String> {
        let Factor { llt, n } = self.factor.as_ref().ok_or("no factorisation to solve with")?;
        let n = *n;
        if rhs.len() != n || solution.len() != n {
            return Err(format!(
                "expected {n} rows, got rhs {} / solution {}",
                rhs.len(),
                solution.len()
            ));
        }

        let b = Mat::from_fn(n, 3, |i, axis| rhs[i][axis]);
        let x = llt.solve(&b);
        for (i, out) in solution.iter_mut().enumerate() {
            *out = DVec3::new(x[(i, 0)], x[(i, 1)], x[(i, 2)]);
        }
        Ok(())
    }

    fn is_factorized(&self) -> bool {
        self.factor.is_some()
    }

    fn release(&mut self) {
        self.factor = None;
    }
}
