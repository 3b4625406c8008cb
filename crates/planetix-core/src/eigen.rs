//! Smallest eigenpairs of sparse symmetric matrices.
//!
//! The matrix is split into the diagonal blocks of its sparsity pattern and
//! every block is solved separately: small blocks with a dense
//! eigendecomposition, large ones with Lanczos iteration and full
//! reorthogonalisation. A disconnected Laplacian therefore yields one zero
//! eigenvalue per component.
//!
//! Within a block the Krylov basis grows until the residual
//! `|beta_m * s_{m,i}|` of every wanted Ritz pair drops below the tolerance,
//! or until the basis cap is reached. The small tridiagonal problem is solved
//! densely with `nalgebra`. When the iteration hits an invariant subspace (a
//! repeated eigenvalue inside one block) it continues from a fresh random
//! direction orthogonal to the basis, which keeps the tridiagonal matrix
//! block-diagonal.

use crate::sparse::CsrMatrix;
use crate::{Error, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};
use petgraph::unionfind::UnionFind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const BREAKDOWN: f64 = 1e-10;

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenConfig {
    /// Residual tolerance. Loose by default: positional encodings do not need
    /// more than two digits.
    pub tol: f64,
    /// Cap on the Krylov basis size. `None` picks `max(20 * count, 200)`,
    /// clamped to the matrix size.
    pub max_basis: Option<usize>,
    /// Check convergence every this many Lanczos steps.
    pub check_every: usize,
    /// Seed for the start vector.
    pub seed: u64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            tol: 1e-2,
            max_basis: None,
            check_every: 10,
            seed: 42,
        }
    }
}

impl EigenConfig {
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_basis(mut self, max_basis: usize) -> Self {
        self.max_basis = Some(max_basis);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Converged eigenpairs, ascending by eigenvalue.
#[derive(Debug, Clone)]
pub struct EigenPairs {
    /// Eigenvalues, ascending.
    pub values: Vec<f64>,
    /// Unit eigenvectors as columns (n x count).
    pub vectors: Array2<f64>,
    /// Largest Krylov basis built; 0 when every block was solved densely.
    pub basis_size: usize,
    /// Largest residual among the returned pairs.
    pub max_residual: f64,
}

/// Compute the `count` smallest eigenpairs of a symmetric matrix.
///
/// The matrix is first split into its diagonal blocks (connected components
/// of the sparsity pattern). Each block is solved on its own, densely when it
/// has at most [`DENSE_BLOCK_LIMIT`] rows and by Lanczos otherwise, and the
/// block spectra are merged.
///
/// Ties between blocks are broken by block order (smallest row index first).
/// Eigenvector signs are fixed so that the largest-magnitude component of
/// each vector is positive.
///
/// # Errors
///
/// - [`Error::Convergence`] when `count` exceeds the matrix size, or when the
///   residuals of a block are still above `config.tol` once the basis cap is
///   reached.
/// - [`Error::DimensionMismatch`] for a non-square matrix.
pub fn smallest_eigenpairs(
    matrix: &CsrMatrix,
    count: usize,
    config: &EigenConfig,
) -> Result<EigenPairs> {
    let (n, cols) = matrix.shape();
    if n != cols {
        return Err(Error::DimensionMismatch {
            what: "matrix columns",
            expected: n,
            got: cols,
        });
    }
    if count == 0 {
        return Err(Error::InvalidConfig("requested zero eigenpairs".into()));
    }
    if count > n {
        return Err(Error::Convergence {
            requested: count,
            num_nodes: n,
            detail: "matrix is smaller than the number of requested eigenpairs".into(),
        });
    }
    if config.check_every == 0 {
        return Err(Error::InvalidConfig("check_every must be positive".into()));
    }

    let blocks = diagonal_blocks(matrix);
    debug!(rows = n, blocks = blocks.len(), "split into diagonal blocks");

    let mut solved = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let want = count.min(block.rows.len());
        let pairs = if block.rows.len() <= DENSE_BLOCK_LIMIT {
            dense_pairs(&block.matrix, want)
        } else {
            lanczos(&block.matrix, want, config)?
        };
        solved.push(pairs);
    }

    // (block, column) of every candidate pair, smallest eigenvalues first
    let mut candidates: Vec<(usize, usize)> = solved
        .iter()
        .enumerate()
        .flat_map(|(b, pairs)| (0..pairs.values.len()).map(move |c| (b, c)))
        .collect();
    candidates.sort_by_key(|&(b, c)| (order_key(solved[b].values[c]), b));
    candidates.truncate(count);

    let mut values = Vec::with_capacity(count);
    let mut vectors = Array2::zeros((n, count));
    let mut max_residual = 0.0f64;
    for (out, &(b, c)) in candidates.iter().enumerate() {
        let pairs = &solved[b];
        values.push(pairs.values[c]);
        max_residual = max_residual.max(pairs.max_residual);
        for (local, &row) in blocks[b].rows.iter().enumerate() {
            vectors[[row, out]] = pairs.vectors[[local, c]];
        }
    }

    Ok(EigenPairs {
        values,
        vectors,
        basis_size: solved.iter().map(|p| p.basis_size).max().unwrap_or(0),
        max_residual,
    })
}

/// Blocks up to this many rows are solved with a dense eigendecomposition.
pub const DENSE_BLOCK_LIMIT: usize = 64;

/// Eigenvalues closer than this sort as equal, so near-zero noise does not
/// decide between blocks.
const ORDER_QUANTUM: f64 = 1e-9;

fn order_key(value: f64) -> i64 {
    (value / ORDER_QUANTUM).round() as i64
}

struct Block {
    /// Global row ids, ascending.
    rows: Vec<usize>,
    matrix: CsrMatrix,
}

/// Split `matrix` into the diagonal blocks of its sparsity pattern, ordered
/// by smallest row.
fn diagonal_blocks(matrix: &CsrMatrix) -> Vec<Block> {
    let (n, _) = matrix.shape();
    let mut uf = UnionFind::<usize>::new(n);
    for (r, c, v) in matrix.triplets() {
        if r != c && v != 0.0 {
            uf.union(r, c);
        }
    }
    let labels = uf.into_labeling();

    // block index by representative, in order of first appearance
    let mut block_of = vec![usize::MAX; n];
    let mut local_of = vec![0; n];
    let mut rows: Vec<Vec<usize>> = Vec::new();
    for (v, &root) in labels.iter().enumerate() {
        if block_of[root] == usize::MAX {
            block_of[root] = rows.len();
            rows.push(Vec::new());
        }
        let b = block_of[root];
        local_of[v] = rows[b].len();
        rows[b].push(v);
    }

    let mut triplets: Vec<Vec<(usize, usize, f64)>> = vec![Vec::new(); rows.len()];
    for (r, c, v) in matrix.triplets() {
        let b = block_of[labels[r]];
        // entries across blocks are explicit zeros
        if b == block_of[labels[c]] {
            triplets[b].push((local_of[r], local_of[c], v));
        }
    }

    rows.into_iter()
        .zip(triplets)
        .map(|(rows, t)| {
            let size = rows.len();
            Block {
                rows,
                matrix: CsrMatrix::from_triplets(size, size, t),
            }
        })
        .collect()
}

/// Exact eigenpairs of a small block.
fn dense_pairs(matrix: &CsrMatrix, count: usize) -> EigenPairs {
    let (n, _) = matrix.shape();
    let mut dense = DMatrix::zeros(n, n);
    for (r, c, v) in matrix.triplets() {
        dense[(r, c)] = v;
    }
    let eig = SymmetricEigen::new(dense);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    order.truncate(count);

    let mut vectors = Array2::zeros((n, count));
    for (c, &i) in order.iter().enumerate() {
        let mut col = Array1::from_shape_fn(n, |r| eig.eigenvectors[(r, i)]);
        fix_sign(&mut col);
        vectors.column_mut(c).assign(&col);
    }

    EigenPairs {
        values: order.iter().map(|&i| eig.eigenvalues[i]).collect(),
        vectors,
        basis_size: 0,
        max_residual: 0.0,
    }
}

/// Lanczos on a single block.
fn lanczos(matrix: &CsrMatrix, count: usize, config: &EigenConfig) -> Result<EigenPairs> {
    let (n, _) = matrix.shape();
    let max_basis = config
        .max_basis
        .unwrap_or_else(|| (20 * count).max(200))
        .clamp(count, n);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut basis: Vec<Array1<f64>> = Vec::with_capacity(max_basis);
    let mut alphas: Vec<f64> = Vec::with_capacity(max_basis);
    // betas[j] couples basis vectors j and j + 1; zero after a restart.
    let mut betas: Vec<f64> = Vec::with_capacity(max_basis);

    let mut v = fresh_direction(&basis, n, &mut rng).ok_or_else(|| Error::Convergence {
        requested: count,
        num_nodes: n,
        detail: "could not draw a start vector".into(),
    })?;
    let mut last_residual = f64::INFINITY;

    loop {
        let mut w = matrix.matvec(v.view());
        let alpha = w.dot(&v);
        w.scaled_add(-alpha, &v);
        if let (Some(prev), Some(&beta)) = (basis.last(), betas.last()) {
            w.scaled_add(-beta, prev);
        }
        basis.push(v);
        alphas.push(alpha);
        orthogonalize(&mut w, &basis);
        let beta = w.dot(&w).sqrt();
        let m = basis.len();

        let exhausted = m == max_basis || m == n;
        if m >= count && (exhausted || beta < BREAKDOWN || m % config.check_every == 0) {
            let (values, coords) = ritz_pairs(&alphas, &betas, count);
            last_residual = (0..count)
                .map(|i| (beta * coords[(m - 1, i)]).abs())
                .fold(0.0, f64::max);
            debug!(basis = m, residual = last_residual, "lanczos convergence check");

            if last_residual <= config.tol || m == n {
                return Ok(assemble(&basis, values, &coords, n, last_residual));
            }
        }

        if m == max_basis {
            break;
        }

        if beta < BREAKDOWN {
            match fresh_direction(&basis, n, &mut rng) {
                Some(next) => {
                    betas.push(0.0);
                    v = next;
                }
                None if m >= count => {
                    // The basis spans the whole space, so the Ritz pairs are exact.
                    let (values, coords) = ritz_pairs(&alphas, &betas, count);
                    return Ok(assemble(&basis, values, &coords, n, 0.0));
                }
                None => break,
            }
        } else {
            betas.push(beta);
            v = w / beta;
        }
    }

    Err(Error::Convergence {
        requested: count,
        num_nodes: n,
        detail: format!(
            "residual {last_residual:.3e} above tolerance {:.1e} after {} Lanczos vectors",
            config.tol,
            basis.len()
        ),
    })
}

/// Two passes of classical Gram-Schmidt against the whole basis.
fn orthogonalize(w: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for _ in 0..2 {
        for q in basis {
            let proj = w.dot(q);
            w.scaled_add(-proj, q);
        }
    }
}

/// Random unit vector orthogonal to `basis`, or `None` if the basis spans everything.
fn fresh_direction(basis: &[Array1<f64>], n: usize, rng: &mut ChaCha8Rng) -> Option<Array1<f64>> {
    if basis.len() >= n {
        return None;
    }
    let mut v = Array1::from_shape_fn(n, |_| rng.gen::<f64>() - 0.5);
    orthogonalize(&mut v, basis);
    let norm = v.dot(&v).sqrt();
    if norm < BREAKDOWN {
        return None;
    }
    Some(v / norm)
}

/// Eigen-decompose the tridiagonal matrix and keep the `count` smallest pairs.
///
/// Returns ascending eigenvalues and their coordinates in the Lanczos basis
/// (m x count).
fn ritz_pairs(alphas: &[f64], betas: &[f64], count: usize) -> (Vec<f64>, DMatrix<f64>) {
    let m = alphas.len();
    let t = DMatrix::from_fn(m, m, |i, j| {
        if i == j {
            alphas[i]
        } else if i + 1 == j {
            betas[i]
        } else if j + 1 == i {
            betas[j]
        } else {
            0.0
        }
    });
    let eig = SymmetricEigen::new(t);

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    order.truncate(count);

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let coords = DMatrix::from_fn(m, count, |r, c| eig.eigenvectors[(r, order[c])]);
    (values, coords)
}

fn assemble(
    basis: &[Array1<f64>],
    values: Vec<f64>,
    coords: &DMatrix<f64>,
    n: usize,
    max_residual: f64,
) -> EigenPairs {
    let count = values.len();
    let mut vectors = Array2::zeros((n, count));

    for c in 0..count {
        let mut col = Array1::<f64>::zeros(n);
        for (j, q) in basis.iter().enumerate() {
            col.scaled_add(coords[(j, c)], q);
        }
        let norm = col.dot(&col).sqrt();
        if norm > 0.0 {
            col /= norm;
        }
        fix_sign(&mut col);
        vectors.column_mut(c).assign(&col);
    }

    EigenPairs {
        values,
        vectors,
        basis_size: basis.len(),
        max_residual,
    }
}

/// Flip `col` so its largest-magnitude component is positive.
fn fix_sign(col: &mut Array1<f64>) {
    let pivot = col
        .iter()
        .copied()
        .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        col.mapv_inplace(|x| -x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laplacian::normalized_laplacian;
    use crate::{Graph, NodeFeatures};

    fn diagonal(values: &[f64]) -> CsrMatrix {
        CsrMatrix::from_triplets(
            values.len(),
            values.len(),
            values.iter().enumerate().map(|(i, &v)| (i, i, v)),
        )
    }

    /// Combinatorial Laplacian of the path 0-1-..-(n-1).
    fn path_laplacian(n: usize) -> CsrMatrix {
        let mut t = Vec::new();
        for i in 0..n {
            let deg = if i == 0 || i + 1 == n { 1.0 } else { 2.0 };
            t.push((i, i, deg));
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
                t.push((i + 1, i, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, t)
    }

    fn undirected(n: usize, pairs: &[(usize, usize)]) -> Graph {
        let edges = pairs.iter().flat_map(|&(a, b)| [(a, b), (b, a)]).collect();
        Graph::new(n, edges, NodeFeatures::Dense(ndarray::Array2::zeros((n, 1)))).unwrap()
    }

    /// Disjoint rings with two chords each, one ring per entry of `sizes`.
    fn rings(sizes: &[usize]) -> Graph {
        let mut pairs = Vec::new();
        let mut offset = 0;
        for &size in sizes {
            for i in 0..size {
                pairs.push((offset + i, offset + (i + 1) % size));
            }
            pairs.push((offset, offset + size / 3));
            pairs.push((offset + 1, offset + size / 2 + 3));
            offset += size;
        }
        undirected(offset, &pairs)
    }

    fn dense_spectrum(m: &CsrMatrix) -> Vec<f64> {
        let (n, _) = m.shape();
        let mut dense = DMatrix::zeros(n, n);
        for (r, c, v) in m.triplets() {
            dense[(r, c)] = v;
        }
        let mut values: Vec<f64> = SymmetricEigen::new(dense).eigenvalues.iter().copied().collect();
        values.sort_by(f64::total_cmp);
        values
    }

    fn tight() -> EigenConfig {
        EigenConfig::default().with_tol(1e-8)
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = diagonal(&[3.0, 1.0, 2.0, 5.0, 4.0]);
        let pairs = smallest_eigenpairs(&m, 2, &tight()).unwrap();
        assert!((pairs.values[0] - 1.0).abs() < 1e-8);
        assert!((pairs.values[1] - 2.0).abs() < 1e-8);
        // eigenvector of 1.0 is e_1, sign fixed positive
        assert!((pairs.vectors[[1, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_path_laplacian_spectrum() {
        // path 0-1-2: eigenvalues 0, 1, 3
        let pairs = smallest_eigenpairs(&path_laplacian(3), 3, &EigenConfig::default()).unwrap();
        let expected = [0.0, 1.0, 3.0];
        for (got, want) in pairs.values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-8, "{got} vs {want}");
        }
    }

    #[test]
    fn test_large_block_matches_dense_solver() {
        let m = path_laplacian(150);
        let pairs = smallest_eigenpairs(&m, 4, &tight()).unwrap();
        assert!(pairs.basis_size > 0, "block should go through lanczos");

        let exact = dense_spectrum(&m);
        for (got, want) in pairs.values.iter().zip(&exact) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
    }

    #[test]
    fn test_repeated_eigenvalue_via_restart() {
        // normalized Laplacian of K_70: 0 once, 70/69 with multiplicity 69.
        // Lanczos breaks down after two steps and must restart.
        let n = 70;
        let pairs: Vec<_> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let l = normalized_laplacian(&undirected(n, &pairs));
        let result = smallest_eigenpairs(&l, 3, &tight()).unwrap();

        let high = 70.0 / 69.0;
        assert!(result.values[0].abs() < 1e-8);
        assert!((result.values[1] - high).abs() < 1e-8);
        assert!((result.values[2] - high).abs() < 1e-8);
    }

    #[test]
    fn test_disconnected_matches_dense_spectrum() {
        let sizes = [60, 70, 80, 90, 100, 110];
        let l = normalized_laplacian(&rings(&sizes));
        let exact = dense_spectrum(&l);
        assert!(exact[..6].iter().all(|v| v.abs() < 1e-8));

        let pairs = smallest_eigenpairs(&l, 9, &tight()).unwrap();
        for (i, (got, want)) in pairs.values.iter().zip(&exact).enumerate() {
            assert!((got - want).abs() < 1e-6, "value {i}: {got} vs {want}");
        }
        assert!(pairs.max_residual <= 1e-8);
    }

    #[test]
    fn test_default_tolerance_finds_every_zero() {
        let l = normalized_laplacian(&rings(&[40; 10]));
        let pairs = smallest_eigenpairs(&l, 5, &EigenConfig::default()).unwrap();
        assert!(pairs.values.iter().all(|v| v.abs() < 1e-8), "{:?}", pairs.values);
    }

    #[test]
    fn test_vectors_stay_inside_their_component() {
        let sizes = [70, 80, 90];
        let l = normalized_laplacian(&rings(&sizes));
        let pairs = smallest_eigenpairs(&l, 5, &tight()).unwrap();

        let starts = [0, 70, 150, 240];
        for c in 0..5 {
            let col = pairs.vectors.column(c);
            let touched: Vec<usize> = (0..3)
                .filter(|&k| (starts[k]..starts[k + 1]).any(|r| col[r].abs() > 1e-12))
                .collect();
            assert_eq!(touched.len(), 1, "column {c} spans {touched:?}");
        }
    }

    #[test]
    fn test_too_many_pairs_is_convergence_error() {
        let m = CsrMatrix::identity(3);
        let err = smallest_eigenpairs(&m, 4, &EigenConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Convergence { requested: 4, num_nodes: 3, .. }));
    }

    #[test]
    fn test_basis_cap_without_convergence_errors() {
        // 400 distinct, closely spaced eigenvalues; 3 vectors cannot resolve them
        let config = EigenConfig::default().with_tol(1e-12).with_max_basis(3);
        let err = smallest_eigenpairs(&path_laplacian(400), 2, &config).unwrap_err();
        assert!(matches!(err, Error::Convergence { .. }));
    }

    #[test]
    fn test_vectors_are_orthonormal() {
        let pairs = smallest_eigenpairs(&path_laplacian(120), 4, &tight()).unwrap();
        let gram = pairs.vectors.t().dot(&pairs.vectors);
        for i in 0..4 {
            for j in 0..4 {
                let want = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - want).abs() < 1e-6);
            }
        }
    }
}
