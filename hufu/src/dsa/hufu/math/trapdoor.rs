//! Trapdoor sampling and the block Cholesky factorization of its conditioned covariance.

use alloc::vec::Vec;

use rand_core::RngCore;
use tracing::debug;

use super::{Backend, Matrix, TriangularMatrix};
use crate::{
    SEED_BYTES,
    dsa::hufu::{Config, KeyGenError, MatrixError, ParameterSet, SMALL_MODULUS, SMOOTHING},
    hash::{Domain, derive_seed},
    rand::SeededStream,
    utils::zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing},
};

/// Maps a 2-bit lane to a ternary entry; zero is twice as likely as either sign.
const TERNARY: [i8; 4] = [-1, 0, 0, 1];

// TRAPDOOR MATRIX
// ================================================================================================

/// The short trapdoor `R = [E; S]` with `E` of size `M x M` and `S` of size `N x M`.
#[derive(Clone, PartialEq, Eq)]
pub struct TrapdoorMatrix {
    e: Matrix<i8>,
    s: Matrix<i8>,
}

impl TrapdoorMatrix {
    /// Draws `(M + N) * M` ternary entries, row by row through `E` and then `S`, from two stream
    /// bits each (least significant bits first).
    pub fn sample<P: ParameterSet, R: RngCore>(rng: &mut R) -> Self {
        let count = (P::M + P::N) * P::M;
        let mut bytes = Zeroizing::new(vec![0_u8; P::TRAPDOOR_BYTES]);
        rng.fill_bytes(&mut bytes);

        let mut entries: Vec<i8> = bytes
            .iter()
            .flat_map(|&byte| (0..4).map(move |i| TERNARY[((byte >> (2 * i)) & 3) as usize]))
            .take(count)
            .collect();
        let trapdoor = Self::from_entries::<P>(&entries);
        entries.zeroize();
        trapdoor
    }

    /// Builds the trapdoor from `(M + N) * M` entries in row-major order, `E` first.
    pub(crate) fn from_entries<P: ParameterSet>(entries: &[i8]) -> Self {
        debug_assert_eq!(entries.len(), (P::M + P::N) * P::M);
        let (e, s) = entries.split_at(P::M * P::M);
        Self {
            e: Matrix::from_fn(P::M, P::M, |i, j| e[i * P::M + j]),
            s: Matrix::from_fn(P::N, P::M, |i, j| s[i * P::M + j]),
        }
    }

    /// The `M x M` block `E`.
    pub fn e(&self) -> &Matrix<i8> {
        &self.e
    }

    /// The `N x M` block `S`.
    pub fn s(&self) -> &Matrix<i8> {
        &self.s
    }

    /// Iterates over all entries, `E` first, in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = i8> + '_ {
        self.e.as_slice().iter().chain(self.s.as_slice()).copied()
    }
}

impl Zeroize for TrapdoorMatrix {
    fn zeroize(&mut self) {
        self.e.zeroize();
        self.s.zeroize();
    }
}

impl Drop for TrapdoorMatrix {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for TrapdoorMatrix {}

// CHOLESKY TRIPLE
// ================================================================================================

/// Factors `(L22, L32, L33)` of the perturbation covariance, scaled by `q * r`.
///
/// With `pre = sigma'^2 / (1 - sigma'^2)` they satisfy, before scaling,
///
/// - `L22 * L22^T = pre * S * S^T + sigma'^2 * I`,
/// - `L32 = pre * E * S^T * L22^-T`,
/// - `L33 * L33^T + L32 * L32^T = pre * E * E^T + sigma'^2 * I`.
#[derive(Clone, PartialEq)]
pub struct CholeskyTriple {
    l22: TriangularMatrix,
    l32: Matrix<f64>,
    l33: TriangularMatrix,
}

impl CholeskyTriple {
    /// Factors the conditioned covariance of `trapdoor`.
    ///
    /// # Errors
    /// Returns [`MatrixError::NotPositiveDefinite`] if either diagonal block is not positive
    /// definite, in which case the trapdoor must be discarded.
    pub fn compute<P: ParameterSet>(
        trapdoor: &TrapdoorMatrix,
        backend: &dyn Backend,
    ) -> Result<Self, MatrixError> {
        let sigma_sq = P::sigma_prime_sq();
        let pre = sigma_sq / (1.0 - sigma_sq);
        let (e, s) = (trapdoor.e(), trapdoor.s());

        let s_st = Zeroizing::new(backend.mul_transposed_small(s, s));
        let gram22 = Zeroizing::new(conditioned(&s_st, pre, sigma_sq));
        let mut l22 = TriangularMatrix::cholesky(&gram22)?;

        // L32 = pre * (E * S^T) * inv(L22)^T
        let inv22 = Zeroizing::new(l22.inverse().to_dense());
        let e_st = Zeroizing::new(backend.mul_transposed_small(e, s).map(|&x| x as f64));
        let mut l32 = backend.mul_transposed_f64(&e_st, &inv22);
        l32.as_mut_slice().iter_mut().for_each(|x| *x *= pre);

        // EEt = pre * E * E^T + sigma'^2 * I - L32 * L32^T
        let e_et = Zeroizing::new(backend.mul_transposed_small(e, e));
        let mut gram33 = Zeroizing::new(conditioned(&e_et, pre, sigma_sq));
        let l32_l32t = Zeroizing::new(backend.mul_transposed_f64(&l32, &l32));
        for (g, x) in gram33.as_mut_slice().iter_mut().zip(l32_l32t.as_slice()) {
            *g -= x;
        }
        let l33 = match TriangularMatrix::cholesky(&gram33) {
            Ok(l33) => l33,
            Err(err) => {
                l22.zeroize();
                l32.zeroize();
                return Err(err);
            },
        };

        let mut triple = Self { l22, l32, l33 };
        triple.scale(SMALL_MODULUS as f64 * SMOOTHING);
        Ok(triple)
    }

    /// Wraps factors read from a serialized key.
    pub(crate) fn from_parts<P: ParameterSet>(
        l22: TriangularMatrix,
        l32: Matrix<f64>,
        l33: TriangularMatrix,
    ) -> Result<Self, MatrixError> {
        if l22.dim() != P::N || l33.dim() != P::M {
            return Err(MatrixError::DimensionMismatch {
                expected: P::N + P::M,
                actual: l22.dim() + l33.dim(),
            });
        }
        if l32.rows() != P::M || l32.cols() != P::N {
            return Err(MatrixError::DimensionMismatch {
                expected: P::M * P::N,
                actual: l32.rows() * l32.cols(),
            });
        }
        Ok(Self { l22, l32, l33 })
    }

    /// The `N x N` factor of the `S` block.
    pub fn l22(&self) -> &TriangularMatrix {
        &self.l22
    }

    /// The `M x N` coupling between the `E` and `S` blocks.
    pub fn l32(&self) -> &Matrix<f64> {
        &self.l32
    }

    /// The `M x M` factor of the `E` block.
    pub fn l33(&self) -> &TriangularMatrix {
        &self.l33
    }

    fn scale(&mut self, factor: f64) {
        self.l22.scale(factor);
        self.l33.scale(factor);
        self.l32.as_mut_slice().iter_mut().for_each(|x| *x *= factor);
    }
}

impl Zeroize for CholeskyTriple {
    fn zeroize(&mut self) {
        self.l22.zeroize();
        self.l32.zeroize();
        self.l33.zeroize();
    }
}

impl Drop for CholeskyTriple {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for CholeskyTriple {}

// TRAPDOOR GENERATION
// ================================================================================================

/// Samples a trapdoor from `seed` and factors its covariance.
///
/// When a factorization fails the seed is replaced by `SHAKE256(Reseed || seed)` and a new
/// trapdoor is drawn, up to [`Config::max_keygen_attempts`] times.
pub fn generate_trapdoor<P: ParameterSet>(
    seed: &[u8; SEED_BYTES],
    config: &Config,
) -> Result<(TrapdoorMatrix, CholeskyTriple), KeyGenError> {
    let backend = config.backend().backend();
    let mut seed = Zeroizing::new(*seed);

    for attempt in 1..=config.max_keygen_attempts() {
        let mut rng = SeededStream::new(&seed, Domain::Trapdoor);
        let trapdoor = TrapdoorMatrix::sample::<P, _>(&mut rng);

        match CholeskyTriple::compute::<P>(&trapdoor, backend) {
            Ok(triple) => return Ok((trapdoor, triple)),
            Err(err) => {
                debug!(set = P::NAME, attempt, %err, "trapdoor rejected, deriving a new seed");
                *seed = derive_seed(Domain::Reseed, &[&seed[..]]);
            },
        }
    }

    Err(KeyGenError::Exhausted { attempts: config.max_keygen_attempts() })
}

// HELPERS
// ================================================================================================

/// Returns `pre * gram + sigma_sq * I` as a dense float matrix.
fn conditioned(gram: &Matrix<i32>, pre: f64, sigma_sq: f64) -> Matrix<f64> {
    Matrix::from_fn(gram.rows(), gram.cols(), |i, j| {
        let scaled = pre * gram.row(i)[j] as f64;
        if i == j { scaled + sigma_sq } else { scaled }
    })
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use num::Float;

    use super::*;
    use crate::dsa::hufu::{BackendKind, params::Toy};

    /// Toy dimensions with `sigma'^2 = 1.5`, so `pre = -3` and `S * S^T` is never dominated.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    struct Fragile;

    impl ParameterSet for Fragile {
        const NAME: &'static str = "HuFu-fragile";
        const M: usize = Toy::M;
        const N: usize = Toy::N;
        const GADGET_BASE: u32 = Toy::GADGET_BASE;
        const MODULUS: u32 = Toy::MODULUS;
        const MODULUS_BITS: u32 = Toy::MODULUS_BITS;
        const SIGMA: f64 = 26.0;
        const BOUND_SQUARE: u64 = Toy::BOUND_SQUARE;
        const KEEP_BITS: u32 = Toy::KEEP_BITS;
        const FREQUENCIES: &'static [u16] = Toy::FREQUENCIES;
        const SIG_BYTES: usize = Toy::SIG_BYTES;
        const MAX_MESSAGE_BYTES: usize = Toy::MAX_MESSAGE_BYTES;
    }

    fn assert_close(actual: &Matrix<f64>, expected: &Matrix<f64>) {
        let scale = expected.as_slice().iter().fold(1.0_f64, |m, x| m.max(Float::abs(*x)));
        for (a, e) in actual.as_slice().iter().zip(expected.as_slice()) {
            assert!(Float::abs(a - e) <= 1e-6 * scale, "{a} vs {e}");
        }
    }

    #[test]
    fn factors_reconstruct_the_conditioned_gram_matrices() {
        let seed = [3_u8; SEED_BYTES];
        let (trapdoor, triple) = generate_trapdoor::<Toy>(&seed, &Config::default()).unwrap();
        let backend = BackendKind::Scalar.backend();

        let sigma_sq = Toy::sigma_prime_sq();
        let pre = sigma_sq / (1.0 - sigma_sq);
        let qr_sq = (SMALL_MODULUS as f64 * SMOOTHING) * (SMALL_MODULUS as f64 * SMOOTHING);
        let unscale = |m: Matrix<f64>| m.map(|x| x / qr_sq);

        let (e, s) = (trapdoor.e(), trapdoor.s());
        let expected22 = conditioned(&backend.mul_transposed_small(s, s), pre, sigma_sq);
        assert_close(&unscale(triple.l22().gram()), &expected22);

        let expected33 = conditioned(&backend.mul_transposed_small(e, e), pre, sigma_sq);
        let l33_part = triple.l33().gram();
        let l32_part = backend.mul_transposed_f64(triple.l32(), triple.l32());
        let sum = Matrix::from_fn(Toy::M, Toy::M, |i, j| l33_part.row(i)[j] + l32_part.row(i)[j]);
        assert_close(&unscale(sum), &expected33);

        // L22 * L32^T = pre * S * E^T, the off-diagonal block
        let l22 = triple.l22().to_dense();
        let cross = unscale(backend.mul_transposed_f64(&l22, triple.l32()));
        let expected_cross = backend.mul_transposed_small(s, e).map(|&x| pre * x as f64);
        assert_close(&cross, &expected_cross);
    }

    #[test]
    fn trapdoor_entries_are_ternary_with_half_zeros() {
        let mut rng = SeededStream::new(&[4; SEED_BYTES], Domain::Trapdoor);
        let trapdoor = TrapdoorMatrix::sample::<Toy, _>(&mut rng);
        let count = (Toy::M + Toy::N) * Toy::M;
        assert_eq!(trapdoor.entries().count(), count);
        assert!(trapdoor.entries().all(|x| (-1..=1).contains(&x)));

        let zeros = trapdoor.entries().filter(|&x| x == 0).count() as f64 / count as f64;
        assert!(Float::abs(zeros - 0.5) < 0.06, "{zeros}");
    }

    #[test]
    fn generation_is_deterministic_and_backend_independent() {
        let seed = [5_u8; SEED_BYTES];
        let scalar = Config::default().with_backend(BackendKind::Scalar);
        let (t1, c1) = generate_trapdoor::<Toy>(&seed, &scalar).unwrap();
        let (t2, c2) = generate_trapdoor::<Toy>(&seed, &Config::default()).unwrap();
        assert!(t1 == t2);
        assert!(c1 == c2);
    }

    #[test]
    fn indefinite_covariance_exhausts_the_attempts() {
        let seed = [6_u8; SEED_BYTES];
        let config = Config::default().with_max_keygen_attempts(3);
        assert_matches!(
            generate_trapdoor::<Fragile>(&seed, &config).err(),
            Some(KeyGenError::Exhausted { attempts: 3 })
        );

        let mut rng = SeededStream::new(&seed, Domain::Trapdoor);
        let trapdoor = TrapdoorMatrix::sample::<Fragile, _>(&mut rng);
        assert_matches!(
            CholeskyTriple::compute::<Fragile>(&trapdoor, BackendKind::Scalar.backend()).err(),
            Some(MatrixError::NotPositiveDefinite { .. })
        );
    }
}
