//! Compressed sparse row matrices.
//!
//! Just enough sparse linear algebra for graph Laplacians: construction from
//! triplets, matrix-vector products, transposition and symmetry checks.

use ndarray::{Array1, Array2, ArrayView1};

/// Real matrix in CSR layout. Column indices are sorted within each row and
/// unique.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from `(row, col, value)` triplets. Duplicates are summed.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside `n_rows x n_cols`.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets.into_iter().collect();
        sorted.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = vec![0; n_rows + 1];
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (r, c, v) in sorted {
            assert!(r < n_rows && c < n_cols, "triplet ({r}, {c}) out of bounds");
            if last == Some((r, c)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
                continue;
            }
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
            last = Some((r, c));
        }

        for i in 0..n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// The n x n identity.
    pub fn identity(n: usize) -> Self {
        Self::from_triplets(n, n, (0..n).map(|i| (i, i, 1.0)))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `i` as `(col, value)`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// All stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_rows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    /// Entry `(i, j)`, zero when not stored. O(log d).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[start..end].binary_search(&j) {
            Ok(pos) => self.values[start + pos],
            Err(_) => 0.0,
        }
    }

    /// y = A x
    pub fn matvec(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        debug_assert_eq!(x.len(), self.n_cols);
        Array1::from_shape_fn(self.n_rows, |r| self.row(r).map(|(c, v)| v * x[c]).sum())
    }

    pub fn transpose(&self) -> Self {
        Self::from_triplets(
            self.n_cols,
            self.n_rows,
            self.triplets().map(|(r, c, v)| (c, r, v)),
        )
    }

    /// True when square and `|A_ij - A_ji| <= tol` everywhere.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.n_rows != self.n_cols {
            return false;
        }
        self.triplets()
            .all(|(r, c, v)| (v - self.get(c, r)).abs() <= tol)
    }

    /// (A + A^T) / 2
    pub fn symmetrized(&self) -> Self {
        let t = self.transpose();
        Self::from_triplets(
            self.n_rows,
            self.n_cols,
            self.triplets()
                .chain(t.triplets())
                .map(|(r, c, v)| (r, c, 0.5 * v)),
        )
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_rows, self.n_cols));
        for (r, c, v) in self.triplets() {
            out[[r, c]] = v;
        }
        out
    }
}
