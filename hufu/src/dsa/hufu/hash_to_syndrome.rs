use alloc::vec::Vec;

use super::{ParameterSet, SALT_BYTES};
use crate::hash::{Domain, Shake256Xof};

/// Hashes a salted message to a syndrome `u` in `Z_Q^M`.
///
/// The syndrome is read from `SHAKE256(Message || message || salt)` as `M` consecutive
/// little-endian `u32` words reduced modulo `Q`.
pub fn hash_to_syndrome<P: ParameterSet>(message: &[u8], salt: &[u8; SALT_BYTES]) -> Vec<u32> {
    Shake256Xof::new(Domain::Message, &[message, salt]).squeeze_words_mod(P::M, P::MODULUS)
}

// TESTS
// ================================================================================================
