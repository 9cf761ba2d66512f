use super::{
    ParameterSet,
    math::{Backend, Matrix, TrapdoorMatrix},
};
use crate::{SEED_BYTES, hash::Shake128Xof};

mod public_key;
pub use public_key::PublicKey;

mod secret_key;
pub use secret_key::SecretKey;

// PUBLIC MATRIX
// ================================================================================================

/// Expands `seed_A` into the `M x N` matrix `A_hat`, row by row, from SHAKE128 words reduced
/// modulo `Q`.
pub(crate) fn expand_public_matrix<P: ParameterSet>(seed_a: &[u8; SEED_BYTES]) -> Matrix<u32> {
    let words = Shake128Xof::new(seed_a).squeeze_words_mod(P::M * P::N, P::MODULUS);
    // the XOF returns exactly `M * N` words
    Matrix::from_fn(P::M, P::N, |i, j| words[i * P::N + j])
}

/// Returns `B = p * I - (A_hat * S + E) mod Q`.
pub(crate) fn compute_b<P: ParameterSet>(
    a_hat: &Matrix<u32>,
    trapdoor: &TrapdoorMatrix,
    backend: &dyn Backend,
) -> Matrix<u32> {
    let modulus = P::MODULUS as i64;
    let a_s = backend.mul_small_mod(a_hat, trapdoor.s(), P::MODULUS);
    let e = trapdoor.e();
    Matrix::from_fn(P::M, P::M, |i, j| {
        let gadget = if i == j { P::GADGET_BASE as i64 } else { 0 };
        (gadget - a_s.row(i)[j] as i64 - e.row(i)[j] as i64).rem_euclid(modulus) as u32
    })
}

// TESTS
// ================================================================================================
