//! Dense and lower-triangular matrices with owned, row-major storage.

use alloc::vec::Vec;
use core::fmt;

use num::Float;

use crate::{dsa::hufu::MatrixError, utils::zeroize::Zeroize};

// DENSE MATRIX
// ================================================================================================

/// A dense `rows x cols` matrix stored row by row in a single owned buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Returns a matrix with every entry set to `T::default()`.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![T::default(); rows * cols] }
    }

    /// Builds a matrix by evaluating `f(row, col)` in row-major order.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Returns the entry at `(row, col)`, or `None` if it lies outside the matrix.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Overwrites the entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::OutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }
}

impl<T> Matrix<T> {
    /// Wraps a row-major buffer of exactly `rows * cols` entries.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, MatrixError> {
        if data.len() != rows * cols {
            return Err(MatrixError::DimensionMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i` is not a valid row index.
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns an iterator over the rows of the matrix.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[T]> {
        // `max(1)` keeps `chunks_exact` well defined for matrices without columns
        self.data.chunks_exact(self.cols.max(1))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Applies `f` to every entry, producing a matrix of the same shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl Matrix<f64> {
    /// Returns `self * v`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.cols, v.len());
        self.iter_rows().map(|row| dot(row, v)).collect()
    }
}

impl Matrix<i8> {
    /// Returns `self * v` for a real vector `v`.
    pub fn mul_vec_f64(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.cols, v.len());
        self.iter_rows()
            .map(|row| row.iter().zip(v).fold(0.0, |acc, (&x, &y)| acc + x as f64 * y))
            .collect()
    }
}

impl<T: Zeroize> Zeroize for Matrix<T> {
    fn zeroize(&mut self) {
        self.data.iter_mut().for_each(Zeroize::zeroize);
    }
}

// Entries are never printed; matrices may hold trapdoor material.
impl<T> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix").field("rows", &self.rows).field("cols", &self.cols).finish()
    }
}

// TRIANGULAR MATRIX
// ================================================================================================

/// A square lower-triangular matrix of `f64` entries.
///
/// Only the entries on and below the diagonal are stored, row by row: entry `(i, j)` with `j <= i`
/// lives at index `i * (i + 1) / 2 + j`.
#[derive(Clone, PartialEq)]
pub struct TriangularMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl TriangularMatrix {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Returns the `dim x dim` zero matrix.
    pub fn zeros(dim: usize) -> Self {
        Self { dim, data: vec![0.0; packed_size(dim)] }
    }

    /// Wraps a buffer holding the lower triangle in packed row order.
    pub fn from_packed(dim: usize, data: Vec<f64>) -> Result<Self, MatrixError> {
        let expected = packed_size(dim);
        if data.len() != expected {
            return Err(MatrixError::DimensionMismatch { expected, actual: data.len() });
        }
        Ok(Self { dim, data })
    }

    /// Computes the Cholesky factor `L` of the symmetric matrix `gram`, so that `L * L^T = gram`.
    ///
    /// Only the lower triangle of `gram` is read.
    ///
    /// # Errors
    /// Returns [`MatrixError::NotPositiveDefinite`] if a pivot is not strictly positive, which
    /// includes NaN pivots, and [`MatrixError::DimensionMismatch`] if `gram` is not square.
    pub fn cholesky(gram: &Matrix<f64>) -> Result<Self, MatrixError> {
        if gram.rows() != gram.cols() {
            return Err(MatrixError::DimensionMismatch {
                expected: gram.rows() * gram.rows(),
                actual: gram.rows() * gram.cols(),
            });
        }

        let dim = gram.rows();
        let mut factor = Self::zeros(dim);
        for i in 0..dim {
            let (done, rest) = factor.data.split_at_mut(row_offset(i));
            let row_i = &mut rest[..=i];
            let gram_row = gram.row(i);

            for j in 0..i {
                let row_j = &done[row_offset(j)..row_offset(j) + j + 1];
                let sum = gram_row[j] - dot(&row_i[..j], &row_j[..j]);
                row_i[j] = sum / row_j[j];
            }

            let pivot = gram_row[i] - dot(&row_i[..i], &row_i[..i]);
            if pivot.is_nan() || pivot <= 0.0 {
                return Err(MatrixError::NotPositiveDefinite { index: i });
            }
            row_i[i] = Float::sqrt(pivot);
        }
        Ok(factor)
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns entry `(row, col)`; entries above the diagonal read as zero.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.dim || col >= self.dim {
            None
        } else if col > row {
            Some(0.0)
        } else {
            Some(self.data[row_offset(row) + col])
        }
    }

    /// Overwrites entry `(row, col)`, which must lie on or below the diagonal.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        if row >= self.dim || col >= self.dim {
            return Err(MatrixError::OutOfBounds { row, col, rows: self.dim, cols: self.dim });
        }
        if col > row {
            return Err(MatrixError::AboveDiagonal { row, col });
        }
        self.data[row_offset(row) + col] = value;
        Ok(())
    }

    /// Returns the stored part of row `i`, that is its first `i + 1` entries.
    ///
    /// # Panics
    /// Panics if `i` is not a valid row index.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[row_offset(i)..row_offset(i) + i + 1]
    }

    /// Returns the packed lower triangle.
    pub fn as_packed(&self) -> &[f64] {
        &self.data
    }

    // ARITHMETIC
    // --------------------------------------------------------------------------------------------

    /// Returns the inverse, which is again lower triangular.
    ///
    /// Rows are computed in order from `X_i = (e_i - sum_{k<i} L_ik X_k) / L_ii`. The diagonal
    /// must not contain zeros, which holds for every Cholesky factor.
    pub fn inverse(&self) -> Self {
        let mut inv = Self::zeros(self.dim);
        for i in 0..self.dim {
            let (done, rest) = inv.data.split_at_mut(row_offset(i));
            let row_i = &mut rest[..=i];
            let l_row = self.row(i);

            row_i[i] = 1.0;
            for (k, &l_ik) in l_row[..i].iter().enumerate() {
                let row_k = &done[row_offset(k)..row_offset(k) + k + 1];
                for (x, &y) in row_i[..=k].iter_mut().zip(row_k) {
                    *x -= l_ik * y;
                }
            }

            let inv_diag = 1.0 / l_row[i];
            row_i.iter_mut().for_each(|x| *x *= inv_diag);
        }
        inv
    }

    /// Returns `L * v`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.dim);
        (0..self.dim).map(|i| dot(self.row(i), &v[..=i])).collect()
    }

    /// Multiplies every entry by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|x| *x *= factor);
    }

    /// Expands the matrix into dense storage, with explicit zeros above the diagonal.
    pub fn to_dense(&self) -> Matrix<f64> {
        Matrix::from_fn(self.dim, self.dim, |i, j| {
            if j <= i { self.data[row_offset(i) + j] } else { 0.0 }
        })
    }

    /// Returns `L * L^T`.
    pub fn gram(&self) -> Matrix<f64> {
        Matrix::from_fn(self.dim, self.dim, |i, j| {
            let k = i.min(j);
            dot(&self.row(i)[..=k], &self.row(j)[..=k])
        })
    }
}

impl Zeroize for TriangularMatrix {
    fn zeroize(&mut self) {
        self.data.iter_mut().for_each(Zeroize::zeroize);
    }
}

impl fmt::Debug for TriangularMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriangularMatrix").field("dim", &self.dim).finish()
    }
}

// HELPERS
// ================================================================================================

/// Number of stored entries of a `dim x dim` lower-triangular matrix.
pub const fn packed_size(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

const fn row_offset(i: usize) -> usize {
    i * (i + 1) / 2
}

/// Dot product accumulated left to right.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| acc + x * y)
}

// TESTS
// ================================================================================================
