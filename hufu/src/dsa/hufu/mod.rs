//! HuFu hash-and-sign lattice signatures.
//!
//! HuFu is a GPV-style scheme over the unstructured lattice defined by the public matrix
//! `A = [I | A_hat | B]` modulo `Q = p * q`. The secret key is a short ternary trapdoor
//! `R = [E; S]` with `A * [E; S; I] = p * I (mod Q)`. To sign, the signer
//!
//! 1. hashes the message together with a fresh salt to a syndrome `u`,
//! 2. samples a perturbation `p` whose covariance is conditioned by the trapdoor,
//! 3. rounds `u - A * p` to the gadget lattice `p * Z^M`, obtaining `z` and a small error,
//! 4. outputs `p + [E; S; I] * z`, which is short and satisfies `A * sig = u (mod Q)`.
//!
//! Candidates that are too long, either in Euclidean norm or once entropy coded, are discarded
//! and the loop restarts with a fresh salt.
//!
//! ## Randomness
//!
//! No function in this module keeps generator state. Key generation and signing are
//! deterministic functions of a caller-supplied 32-byte seed; the `with_rng` and (with the `std`
//! feature) argument-free variants merely draw that seed from a generator.
//!
//! ## Parameter sets
//!
//! Keys and signatures are generic over a [ParameterSet]: [HuFu1], [HuFu3] and [HuFu5] provide
//! NIST security levels 1, 3 and 5.

use crate::{
    SEED_BYTES,
    utils::{ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable},
};

mod config;
mod encoding;
mod error;
mod hash_to_syndrome;
mod keys;
pub mod math;
mod params;
mod signature;

#[cfg(test)]
mod tests;

pub use self::{
    config::{
        Config, DEFAULT_MAX_KEYGEN_ATTEMPTS, DEFAULT_MAX_SIGNING_ATTEMPTS, MIN_KEYGEN_ATTEMPTS,
        MIN_SIGNING_ATTEMPTS,
    },
    encoding::{compress, decompress},
    error::{EncodingError, KeyGenError, MatrixError, RejectReason, SamplerError, SigningError},
    hash_to_syndrome::hash_to_syndrome,
    keys::{PublicKey, SecretKey},
    math::BackendKind,
    params::{
        HuFu1, HuFu3, HuFu5, ParameterSet, RANS_SCALE_BITS, SALT_BYTES, SMALL_MODULUS, SMOOTHING,
    },
    signature::{PADDING_BYTE, Signature},
};

// TYPE ALIASES
// ================================================================================================

pub type HuFu1SecretKey = SecretKey<HuFu1>;
pub type HuFu1PublicKey = PublicKey<HuFu1>;
pub type HuFu1Signature = Signature<HuFu1>;

pub type HuFu3SecretKey = SecretKey<HuFu3>;
pub type HuFu3PublicKey = PublicKey<HuFu3>;
pub type HuFu3Signature = Signature<HuFu3>;

pub type HuFu5SecretKey = SecretKey<HuFu5>;
pub type HuFu5PublicKey = PublicKey<HuFu5>;
pub type HuFu5Signature = Signature<HuFu5>;

// KEYPAIR / SIGN / VERIFY
// ================================================================================================

/// Generates a key pair from a 32-byte master seed.
pub fn keypair<P: ParameterSet>(
    seed: &[u8; SEED_BYTES],
    config: &Config,
) -> Result<(PublicKey<P>, SecretKey<P>), KeyGenError> {
    let secret_key = SecretKey::with_seed(seed, config)?;
    Ok((secret_key.public_key(), secret_key))
}

/// Signs `message` under `secret_key`, drawing all randomness from `seed`.
pub fn sign<P: ParameterSet>(
    secret_key: &SecretKey<P>,
    message: &[u8],
    seed: &[u8; SEED_BYTES],
    config: &Config,
) -> Result<Signature<P>, SigningError> {
    secret_key.sign_with_seed(message, seed, config)
}

/// Returns true if `signature` is a valid signature under `public_key`.
pub fn verify<P: ParameterSet>(public_key: &PublicKey<P>, signature: &Signature<P>) -> bool {
    public_key.verify(signature)
}

// HELPERS
// ================================================================================================

/// Returns the squared Euclidean norm of the concatenation of `parts`.
///
/// The sum saturates rather than wraps, so an absurdly long vector can never pass a bound check.
pub(crate) fn squared_norm(parts: &[&[i64]]) -> u64 {
    parts.iter().flat_map(|part| part.iter()).fold(0_u64, |acc, &x| {
        let magnitude = x.unsigned_abs();
        acc.saturating_add(magnitude.saturating_mul(magnitude))
    })
}
