//! Pluggable kernels for the large matrix products of key generation, signing and verification.
//!
//! Every backend evaluates each output entry with the same row kernel and the same summation
//! order, so the integer results of all backends are bit-for-bit identical and the floating-point
//! results agree exactly as well. Backends only differ in how rows are scheduled.

use alloc::vec::Vec;
use core::fmt::Debug;

#[cfg(feature = "concurrent")]
use rayon::prelude::*;

use super::matrix::{Matrix, dot};

// BACKEND
// ================================================================================================

/// Dense matrix kernels used by the scheme.
///
/// Moduli passed to the modular kernels must be powers of two; accumulation wraps in `i64` and is
/// then reduced, which is exact for any power-of-two modulus up to `2^32` and any input.
pub trait Backend: Debug + Send + Sync {
    /// Returns a short name used in logs and benchmark labels.
    fn name(&self) -> &'static str;

    /// Returns `a * v mod modulus` with entries in `[0, modulus)`.
    fn mul_vec_mod(&self, a: &Matrix<u32>, v: &[i64], modulus: u32) -> Vec<u32>;

    /// Returns `s * v` over the integers for a matrix with small entries.
    fn mul_vec_small(&self, s: &Matrix<i8>, v: &[i64]) -> Vec<i64>;

    /// Returns `a * s mod modulus` with entries in `[0, modulus)`.
    fn mul_small_mod(&self, a: &Matrix<u32>, s: &Matrix<i8>, modulus: u32) -> Matrix<u32>;

    /// Returns `x * y^T` over the integers for matrices with small entries.
    fn mul_transposed_small(&self, x: &Matrix<i8>, y: &Matrix<i8>) -> Matrix<i32>;

    /// Returns `x * y^T`, each entry summed left to right.
    fn mul_transposed_f64(&self, x: &Matrix<f64>, y: &Matrix<f64>) -> Matrix<f64>;
}

// BACKEND SELECTION
// ================================================================================================

/// Identifies one of the built-in backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Single-threaded row-by-row evaluation.
    Scalar,
    /// Rows distributed over the rayon thread pool.
    #[cfg(feature = "concurrent")]
    Parallel,
}

impl BackendKind {
    /// Returns the backend implementation for this kind.
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            BackendKind::Scalar => &ScalarBackend,
            #[cfg(feature = "concurrent")]
            BackendKind::Parallel => &ParallelBackend,
        }
    }
}

impl Default for BackendKind {
    #[cfg(feature = "concurrent")]
    fn default() -> Self {
        BackendKind::Parallel
    }

    #[cfg(not(feature = "concurrent"))]
    fn default() -> Self {
        BackendKind::Scalar
    }
}

// SCALAR BACKEND
// ================================================================================================

/// Evaluates every product row by row on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend;

impl Backend for ScalarBackend {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn mul_vec_mod(&self, a: &Matrix<u32>, v: &[i64], modulus: u32) -> Vec<u32> {
        debug_assert_eq!(a.cols(), v.len());
        a.iter_rows().map(|row| row_dot_mod(row, v, modulus)).collect()
    }

    fn mul_vec_small(&self, s: &Matrix<i8>, v: &[i64]) -> Vec<i64> {
        debug_assert_eq!(s.cols(), v.len());
        s.iter_rows().map(|row| row_dot_small(row, v)).collect()
    }

    fn mul_small_mod(&self, a: &Matrix<u32>, s: &Matrix<i8>, modulus: u32) -> Matrix<u32> {
        debug_assert_eq!(a.cols(), s.rows());
        let mut out = Matrix::zeros(a.rows(), s.cols());
        let width = s.cols().max(1);
        for (out_row, a_row) in out.as_mut_slice().chunks_exact_mut(width).zip(a.iter_rows()) {
            row_mul_small_mod(a_row, s, modulus, out_row);
        }
        out
    }

    fn mul_transposed_small(&self, x: &Matrix<i8>, y: &Matrix<i8>) -> Matrix<i32> {
        debug_assert_eq!(x.cols(), y.cols());
        let mut out = Matrix::zeros(x.rows(), y.rows());
        let width = y.rows().max(1);
        for (out_row, x_row) in out.as_mut_slice().chunks_exact_mut(width).zip(x.iter_rows()) {
            row_mul_transposed_small(x_row, y, out_row);
        }
        out
    }

    fn mul_transposed_f64(&self, x: &Matrix<f64>, y: &Matrix<f64>) -> Matrix<f64> {
        debug_assert_eq!(x.cols(), y.cols());
        let mut out = Matrix::zeros(x.rows(), y.rows());
        let width = y.rows().max(1);
        for (out_row, x_row) in out.as_mut_slice().chunks_exact_mut(width).zip(x.iter_rows()) {
            row_mul_transposed_f64(x_row, y, out_row);
        }
        out
    }
}

// PARALLEL BACKEND
// ================================================================================================

/// Distributes output rows over the rayon thread pool.
#[cfg(feature = "concurrent")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

#[cfg(feature = "concurrent")]
impl Backend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn mul_vec_mod(&self, a: &Matrix<u32>, v: &[i64], modulus: u32) -> Vec<u32> {
        debug_assert_eq!(a.cols(), v.len());
        a.as_slice()
            .par_chunks_exact(a.cols().max(1))
            .map(|row| row_dot_mod(row, v, modulus))
            .collect()
    }

    fn mul_vec_small(&self, s: &Matrix<i8>, v: &[i64]) -> Vec<i64> {
        debug_assert_eq!(s.cols(), v.len());
        s.as_slice().par_chunks_exact(s.cols().max(1)).map(|row| row_dot_small(row, v)).collect()
    }

    fn mul_small_mod(&self, a: &Matrix<u32>, s: &Matrix<i8>, modulus: u32) -> Matrix<u32> {
        debug_assert_eq!(a.cols(), s.rows());
        let mut out = Matrix::zeros(a.rows(), s.cols());
        out.as_mut_slice()
            .par_chunks_exact_mut(s.cols().max(1))
            .zip(a.as_slice().par_chunks_exact(a.cols().max(1)))
            .for_each(|(out_row, a_row)| row_mul_small_mod(a_row, s, modulus, out_row));
        out
    }

    fn mul_transposed_small(&self, x: &Matrix<i8>, y: &Matrix<i8>) -> Matrix<i32> {
        debug_assert_eq!(x.cols(), y.cols());
        let mut out = Matrix::zeros(x.rows(), y.rows());
        out.as_mut_slice()
            .par_chunks_exact_mut(y.rows().max(1))
            .zip(x.as_slice().par_chunks_exact(x.cols().max(1)))
            .for_each(|(out_row, x_row)| row_mul_transposed_small(x_row, y, out_row));
        out
    }

    fn mul_transposed_f64(&self, x: &Matrix<f64>, y: &Matrix<f64>) -> Matrix<f64> {
        debug_assert_eq!(x.cols(), y.cols());
        let mut out = Matrix::zeros(x.rows(), y.rows());
        out.as_mut_slice()
            .par_chunks_exact_mut(y.rows().max(1))
            .zip(x.as_slice().par_chunks_exact(x.cols().max(1)))
            .for_each(|(out_row, x_row)| row_mul_transposed_f64(x_row, y, out_row));
        out
    }
}

// ROW KERNELS
// ================================================================================================

fn row_dot_mod(row: &[u32], v: &[i64], modulus: u32) -> u32 {
    debug_assert!(modulus.is_power_of_two());
    let acc = row
        .iter()
        .zip(v)
        .fold(0_i64, |acc, (&a, &x)| acc.wrapping_add((a as i64).wrapping_mul(x)));
    acc.rem_euclid(modulus as i64) as u32
}

fn row_dot_small(row: &[i8], v: &[i64]) -> i64 {
    row.iter().zip(v).map(|(&s, &x)| s as i64 * x).sum()
}

fn row_mul_small_mod(a_row: &[u32], s: &Matrix<i8>, modulus: u32, out: &mut [u32]) {
    debug_assert!(modulus.is_power_of_two());
    let mut acc = vec![0_i64; s.cols()];
    for (&a, s_row) in a_row.iter().zip(s.iter_rows()) {
        let a = a as i64;
        for (acc, &x) in acc.iter_mut().zip(s_row) {
            *acc += a * x as i64;
        }
    }
    for (out, acc) in out.iter_mut().zip(acc) {
        *out = acc.rem_euclid(modulus as i64) as u32;
    }
}

fn row_mul_transposed_small(x_row: &[i8], y: &Matrix<i8>, out: &mut [i32]) {
    for (out, y_row) in out.iter_mut().zip(y.iter_rows()) {
        *out = x_row.iter().zip(y_row).map(|(&a, &b)| a as i32 * b as i32).sum();
    }
}

fn row_mul_transposed_f64(x_row: &[f64], y: &Matrix<f64>, out: &mut [f64]) {
    for (out, y_row) in out.iter_mut().zip(y.iter_rows()) {
        *out = dot(x_row, y_row);
    }
}

// TESTS
// ================================================================================================
