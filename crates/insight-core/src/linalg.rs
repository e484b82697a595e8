//! Dense linear algebra kernel
//!
//! Row-major matrices with multiply, transpose and a Gaussian-elimination
//! solver with partial pivoting. This is the only solver used by the
//! regression families.
//!
//! # Limitations
//!
//! The solver is best-effort. A near-singular system (for example collinear
//! regressors) is solved as-is and may produce very large coefficients.
//! A pivot that is exactly zero leaves its unknown at zero, which yields one
//! of the solutions of a consistent singular system.

use crate::error::{Error, Result};
use num_traits::Float;
use std::ops::{Index, IndexMut};

/// Dense row-major matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Float = f64> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Float> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Build from row vectors; all rows must have equal length
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::size_mismatch(cols, row.len(), &format!("matrix row {i}")));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Single-column matrix
    pub fn column(values: &[T]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn column_values(&self, j: usize) -> Vec<T> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t[(j, i)] = self[(i, j)];
            }
        }
        t
    }

    /// Matrix product `self * other`
    pub fn multiply(&self, other: &Matrix<T>) -> Result<Self> {
        if self.cols != other.rows {
            return Err(Error::size_mismatch(self.cols, other.rows, "matrix multiply"));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                if a == T::zero() {
                    continue;
                }
                for j in 0..other.cols {
                    out[(i, j)] = out[(i, j)] + a * other[(k, j)];
                }
            }
        }
        Ok(out)
    }

    /// Matrix-vector product `self * v`
    pub fn mul_vec(&self, v: &[T]) -> Result<Vec<T>> {
        if self.cols != v.len() {
            return Err(Error::size_mismatch(self.cols, v.len(), "matrix-vector multiply"));
        }
        Ok((0..self.rows).map(|i| dot(self.row(i), v)).collect())
    }

    /// Gram matrix `selfᵗ * self`
    pub fn gram(&self) -> Self {
        self.weighted_gram_unchecked(None)
    }

    /// `selfᵗ * diag(w) * self` without materialising the diagonal
    pub fn weighted_gram(&self, weights: &[T]) -> Result<Self> {
        if weights.len() != self.rows {
            return Err(Error::size_mismatch(self.rows, weights.len(), "weight vector"));
        }
        Ok(self.weighted_gram_unchecked(Some(weights)))
    }

    fn weighted_gram_unchecked(&self, weights: Option<&[T]>) -> Self {
        let p = self.cols;
        let mut out = Self::zeros(p, p);
        for i in 0..self.rows {
            let w = weights.map_or(T::one(), |w| w[i]);
            let row = self.row(i);
            for a in 0..p {
                let wa = w * row[a];
                for b in a..p {
                    out[(a, b)] = out[(a, b)] + wa * row[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                out[(a, b)] = out[(b, a)];
            }
        }
        out
    }

    /// `selfᵗ * diag(w) * y`; unit weights when `weights` is `None`
    pub fn transpose_mul_vec(&self, y: &[T], weights: Option<&[T]>) -> Result<Vec<T>> {
        if y.len() != self.rows {
            return Err(Error::size_mismatch(self.rows, y.len(), "response vector"));
        }
        if let Some(w) = weights {
            if w.len() != self.rows {
                return Err(Error::size_mismatch(self.rows, w.len(), "weight vector"));
            }
        }
        let mut out = vec![T::zero(); self.cols];
        for i in 0..self.rows {
            let wy = weights.map_or(T::one(), |w| w[i]) * y[i];
            for (j, acc) in out.iter_mut().enumerate() {
                *acc = *acc + self[(i, j)] * wy;
            }
        }
        Ok(out)
    }

    /// Add `alpha` to every diagonal element
    pub fn add_diagonal(&mut self, alpha: T) {
        for i in 0..self.rows.min(self.cols) {
            self[(i, i)] = self[(i, i)] + alpha;
        }
    }
}

impl<T: Float> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[i * self.cols + j]
    }
}

impl<T: Float> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.data[i * self.cols + j]
    }
}

/// Dot product of two equal-length slices
#[inline]
pub fn dot<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
///
/// Rows are swapped so that the pivot has the largest magnitude in its
/// column, then the upper-triangular system is back-substituted.
pub fn solve<T: Float>(a: &Matrix<T>, b: &[T]) -> Result<Vec<T>> {
    let n = a.rows();
    if a.cols() != n {
        return Err(Error::size_mismatch(n, a.cols(), "solve (matrix must be square)"));
    }
    if b.len() != n {
        return Err(Error::size_mismatch(n, b.len(), "solve right-hand side"));
    }

    let mut m = a.clone();
    let mut rhs = b.to_vec();
    let mut singular = vec![false; n];

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                m[(i, col)]
                    .abs()
                    .partial_cmp(&m[(j, col)].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if pivot_row != col {
            for k in 0..n {
                let tmp = m[(col, k)];
                m[(col, k)] = m[(pivot_row, k)];
                m[(pivot_row, k)] = tmp;
            }
            rhs.swap(col, pivot_row);
        }

        let pivot = m[(col, col)];
        if pivot == T::zero() || !pivot.is_finite() {
            singular[col] = true;
            continue;
        }

        for row in (col + 1)..n {
            let factor = m[(row, col)] / pivot;
            if factor == T::zero() {
                continue;
            }
            m[(row, col)] = T::zero();
            for k in (col + 1)..n {
                m[(row, k)] = m[(row, k)] - factor * m[(col, k)];
            }
            rhs[row] = rhs[row] - factor * rhs[col];
        }
    }

    if singular.iter().any(|&s| s) {
        tracing::debug!(
            "solve: {} zero pivot(s) in {n}x{n} system, affected unknowns set to 0",
            singular.iter().filter(|&&s| s).count()
        );
    }

    let mut x = vec![T::zero(); n];
    for i in (0..n).rev() {
        if singular[i] {
            continue;
        }
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum = sum - m[(i, j)] * x[j];
        }
        x[i] = sum / m[(i, i)];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_multiply_and_transpose() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let at = a.transpose();
        assert_eq!(at.rows(), 3);
        assert_eq!(at.cols(), 2);
        assert_eq!(at[(2, 1)], 6.0);

        let p = a.multiply(&at).unwrap();
        assert_eq!(p, Matrix::from_rows(&[vec![14.0, 32.0], vec![32.0, 77.0]]).unwrap());
        assert_eq!(a.gram(), at.multiply(&a).unwrap());

        assert!(a.multiply(&a).is_err());
    }

    #[test]
    fn test_weighted_products() {
        let x = Matrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 2.0], vec![1.0, 3.0]]).unwrap();
        let w = [1.0, 2.0, 0.5];
        let g = x.weighted_gram(&w).unwrap();
        assert_abs_diff_eq!(g[(0, 0)], 3.5);
        assert_abs_diff_eq!(g[(0, 1)], 1.0 + 4.0 + 1.5);
        assert_abs_diff_eq!(g[(1, 1)], 1.0 + 8.0 + 4.5);

        let xty = x.transpose_mul_vec(&[1.0, 1.0, 1.0], Some(&w)).unwrap();
        assert_eq!(xty, vec![3.5, 6.5]);
        assert!(x.weighted_gram(&[1.0]).is_err());
    }

    #[test]
    fn test_solve_requires_pivoting() {
        // Zero in the leading position forces a row swap
        let a = Matrix::from_rows(&[vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 0.0], vec![2.0, 0.0, 3.0]])
            .unwrap();
        let x_true = [1.0, -2.0, 3.0];
        let b = a.mul_vec(&x_true).unwrap();
        let x = solve(&a, &b).unwrap();
        for (xi, ti) in x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(*xi, *ti, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_near_singular_system_gives_large_coefficients() {
        // Documented limitation: no error, just a huge answer
        let a = Matrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0 + 1e-12]]).unwrap();
        let x = solve(&a, &[2.0, 3.0]).unwrap();
        assert!(x.iter().all(|v| v.is_finite()));
        assert!(x[1].abs() > 1e10);
    }

    #[test]
    fn test_exactly_singular_consistent_system() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let x = solve(&a, &[3.0, 6.0]).unwrap();
        assert_eq!(x, vec![3.0, 0.0]);
        let back = a.mul_vec(&x).unwrap();
        assert_abs_diff_eq!(back[0], 3.0);
        assert_abs_diff_eq!(back[1], 6.0);
    }

    #[test]
    fn test_solve_shape_errors() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(solve(&a, &[1.0]).is_err());
        let sq = Matrix::<f64>::identity(2);
        assert!(solve(&sq, &[1.0]).is_err());
        assert!(Matrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_generic_over_f32() {
        let a: Matrix<f32> = Matrix::from_rows(&[vec![2.0, 0.0], vec![0.0, 4.0]]).unwrap();
        let x = solve(&a, &[2.0, 2.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0f32);
        assert_abs_diff_eq!(x[1], 0.5f32);
    }
}
