//! Public key of the HuFu signature scheme.

use alloc::{string::ToString, vec::Vec};
use core::marker::PhantomData;

use super::{
    super::{
        ByteReader, ByteWriter, Deserializable, DeserializationError, ParameterSet, RejectReason,
        Serializable, Signature,
        math::{Backend, Matrix},
    },
    expand_public_matrix,
};
use crate::{
    SEED_BYTES,
    utils::{SliceReader, pack_lanes, packed_len, unpack_lanes},
};

// PUBLIC KEY
// ================================================================================================

/// Public key `(seed_A, B)` for the parameter set `P`.
///
/// The public matrix is `A = [I | A_hat | B]`, where the `M x N` block `A_hat` is expanded from
/// `seed_A` and the `M x M` block `B` is stored explicitly. The expanded `A_hat` is kept alongside
/// the serialized fields so that verification does not need to squeeze it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey<P: ParameterSet> {
    seed_a: [u8; SEED_BYTES],
    a_hat: Matrix<u32>,
    b: Matrix<u32>,
    _params: PhantomData<P>,
}

impl<P: ParameterSet> PublicKey<P> {
    /// Assembles a key from its parts; `a_hat` must be the expansion of `seed_a`.
    pub(crate) fn from_parts(
        seed_a: [u8; SEED_BYTES],
        a_hat: Matrix<u32>,
        b: Matrix<u32>,
    ) -> Self {
        debug_assert_eq!((a_hat.rows(), a_hat.cols()), (P::M, P::N));
        debug_assert_eq!((b.rows(), b.cols()), (P::M, P::M));
        Self { seed_a, a_hat, b, _params: PhantomData }
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the seed from which `A_hat` is expanded.
    pub fn seed_a(&self) -> &[u8; SEED_BYTES] {
        &self.seed_a
    }

    /// Returns the expanded `M x N` block `A_hat`.
    pub fn a_hat(&self) -> &Matrix<u32> {
        &self.a_hat
    }

    /// Returns the `M x M` block `B`.
    pub fn b(&self) -> &Matrix<u32> {
        &self.b
    }

    // SIGNATURE VERIFICATION
    // --------------------------------------------------------------------------------------------

    /// Returns true if `signature` is a valid signature of the message it carries under this key.
    pub fn verify(&self, signature: &Signature<P>) -> bool {
        self.verify_detailed(signature).is_ok()
    }

    /// Verifies `signature`, reporting why it was rejected.
    pub fn verify_detailed(&self, signature: &Signature<P>) -> Result<(), RejectReason> {
        signature.verify_detailed(self)
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Returns `u - A_hat * x1 - B * x2 mod Q` with entries in `[0, Q)`.
    pub(crate) fn residual(
        &self,
        u: &[u32],
        x1: &[i64],
        x2: &[i64],
        backend: &dyn Backend,
    ) -> Vec<u32> {
        let modulus = P::MODULUS;
        let a_x1 = backend.mul_vec_mod(&self.a_hat, x1, modulus);
        let b_x2 = backend.mul_vec_mod(&self.b, x2, modulus);
        u.iter()
            .zip(a_x1.iter().zip(&b_x2))
            .map(|(&u, (&a, &b))| {
                (u as i64 - a as i64 - b as i64).rem_euclid(modulus as i64) as u32
            })
            .collect()
    }
}

// SERIALIZATION
// ================================================================================================

impl<P: ParameterSet> Serializable for PublicKey<P> {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        let mut packed = Vec::with_capacity(P::PK_BYTES - SEED_BYTES);
        pack_lanes(self.b.as_slice(), P::MODULUS_BITS, &mut packed);
        target.write_bytes(&self.seed_a);
        target.write_bytes(&packed);
    }

    fn get_size_hint(&self) -> usize {
        P::PK_BYTES
    }
}

impl<P: ParameterSet> Deserializable for PublicKey<P> {
    /// Keys have a fixed size, so bytes left over after a complete key are an error.
    fn read_from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let mut source = SliceReader::new(bytes);
        let key = Self::read_from(&mut source)?;
        if source.has_more_bytes() {
            return Err(DeserializationError::UnconsumedBytes);
        }
        Ok(key)
    }

    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let seed_a: [u8; SEED_BYTES] = source.read_array()?;
        let count = P::M * P::M;
        let packed = source.read_slice(packed_len(count, P::MODULUS_BITS))?;

        let entries = unpack_lanes(packed, P::MODULUS_BITS, count).map_err(|err| {
            DeserializationError::InvalidValue(format!("Failed to decode public key: {err}"))
        })?;
        let b = Matrix::from_vec(P::M, P::M, entries)
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))?;

        Ok(Self::from_parts(seed_a, expand_public_matrix::<P>(&seed_a), b))
    }
}
