//! Sparse matrix representation and solver interface.
//!
//! Provides a CSR (Compressed Sparse Row) matrix with the products the
//! local/global solver needs (`AᵀA` and `Aᵀx`), and a trait for sparse
//! Cholesky solvers.

use glam::DVec3;

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in row-major order. This is the standard
/// format for sparse linear algebra libraries (faer, SuiteSparse).
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row pointer array (length = rows + 1).
    /// `row_ptr[i]..row_ptr[i+1]` are the indices into `col_idx` and `values`
    /// for non-zeros in row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Creates an empty CSR matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Creates a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries are summed. Columns within each row are sorted.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Self {
        // Count entries per row
        let mut row_counts = vec![0usize; rows];
        for &(r, _, _) in triplets {
            row_counts[r] += 1;
        }

        let mut row_start = vec![0usize; rows + 1];
        for i in 0..rows {
            row_start[i + 1] = row_start[i] + row_counts[i];
        }

        // Bucket entries by row, using a cursor per row
        let mut buckets = vec![(0usize, 0.0f64); row_start[rows]];
        let mut cursor = row_start[..rows].to_vec();
        for &(r, c, v) in triplets {
            buckets[cursor[r]] = (c, v);
            cursor[r] += 1;
        }

        // Sort each row by column and merge duplicates
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::with_capacity(buckets.len());
        let mut values = Vec::with_capacity(buckets.len());
        row_ptr.push(0);
        for i in 0..rows {
            let row = &mut buckets[row_start[i]..row_start[i + 1]];
            row.sort_unstable_by_key(|&(c, _)| c);
            let mut last_col = None;
            for &(c, v) in row.iter() {
                if last_col == Some(c) {
                    if let Some(acc) = values.last_mut() {
                        *acc += v;
                    }
                } else {
                    col_idx.push(c);
                    values.push(v);
                    last_col = Some(c);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Returns the entry at (`row`, `col`), zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => 0.0,
        }
    }

    /// Assemble the normal matrix `AᵀA + diagonal · I` (cols × cols).
    ///
    /// Every row of `A` scatters the outer product of its entries, so the
    /// cost is the sum of squared row lengths.
    pub fn normal_matrix(&self, diagonal: f64) -> CsrMatrix {
        let mut triplets: Vec<(usize, usize, f64)> = Vec::with_capacity(self.cols);

        if diagonal != 0.0 {
            for i in 0..self.cols {
                triplets.push((i, i, diagonal));
            }
        }

        for row in 0..self.rows {
            let range = self.row_ptr[row]..self.row_ptr[row + 1];
            for a in range.clone() {
                for b in range.clone() {
                    let value = self.values[a] * self.values[b];
                    if value != 0.0 {
                        triplets.push((self.col_idx[a], self.col_idx[b], value));
                    }
                }
            }
        }

        CsrMatrix::from_triplets(self.cols, self.cols, &triplets)
    }

    /// Compute `Aᵀ · x` for a three-column right-hand side.
    ///
    /// `x` has one entry per row; the result has one entry per column.
    pub fn transpose_mul(&self, x: &[DVec3]) -> Vec<DVec3> {
        let mut out = vec![DVec3::ZERO; self.cols];
        for (row, &xr) in x.iter().enumerate().take(self.rows) {
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                out[self.col_idx[idx]] += xr * self.values[idx];
            }
        }
        out
    }

    /// Compute `A · x` for a three-column vector (one entry per column).
    pub fn mul(&self, x: &[DVec3]) -> Vec<DVec3> {
        (0..self.rows)
            .map(|row| {
                (self.row_ptr[row]..self.row_ptr[row + 1])
                    .map(|idx| x[self.col_idx[idx]] * self.values[idx])
                    .sum()
            })
            .collect()
    }
}

/// Trait for sparse symmetric positive-definite solvers.
///
/// The right-hand side carries the x, y and z coordinates of every unknown
/// together; one factorization serves all three columns.
pub trait SparseSolver: Send {
    /// Factorize the matrix. Call once (or after the system changes).
    fn factorize(&mut self, matrix: &CsrMatrix) -> Result<(), String>;

    /// Solve Ax = b using the pre-computed factorization.
    /// Returns x in the provided output buffer.
    fn solve(&self, rhs: &[DVec3], solution: &mut [DVec3]) -> Result<(), String>;

    /// Returns true if the solver holds a valid factorization.
    fn is_factorized(&self) -> bool;

    /// Drops the factorization and its memory.
    fn release(&mut self);
}
