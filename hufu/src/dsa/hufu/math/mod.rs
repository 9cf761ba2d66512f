//! Arithmetic and sampling building blocks of the HuFu signer.
//!
//! The leaves are the dense and triangular matrices and the [Backend] kernels operating on them.
//! On top of those sit the integer Gaussian sampler and its standard-normal companion, the gadget
//! coset sampler, trapdoor generation, and the perturbation (preimage) sampler.

mod backend;
mod gadget;
mod matrix;
mod normal;
mod preimage;
mod samplerz;
mod trapdoor;

#[cfg(feature = "concurrent")]
pub use backend::ParallelBackend;
pub use backend::{Backend, BackendKind, ScalarBackend};
pub use gadget::{GADGET_BYTES_PER_COORDINATE, GadgetSample, round_to_gadget};
pub use matrix::{Matrix, TriangularMatrix, packed_size};
pub use normal::NORMAL_TRIAL_BYTES;
pub use preimage::{Perturbation, sample_preimage};
pub use samplerz::{GaussianSampler, SAMPLERZ_TRIAL_BYTES};
pub use trapdoor::{CholeskyTriple, TrapdoorMatrix, generate_trapdoor};

/// Returns the representative of `x` modulo `modulus` in `[-modulus/2, modulus/2)`.
pub(crate) fn center_mod(x: i64, modulus: u32) -> i64 {
    let modulus = modulus as i64;
    let r = x.rem_euclid(modulus);
    if r >= modulus / 2 { r - modulus } else { r }
}

// TESTS
// ================================================================================================
