use alloc::{string::ToString, vec::Vec};
use core::marker::PhantomData;

use super::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, ParameterSet, RejectReason,
    SALT_BYTES, Serializable,
    encoding::decompress,
    hash_to_syndrome::hash_to_syndrome,
    keys::PublicKey,
    math::{BackendKind, center_mod},
    squared_norm,
};

/// Byte used to pad a signed message up to its fixed size.
pub const PADDING_BYTE: u8 = 0xff;

/// Size of the big-endian payload length prefix.
const LENGTH_BYTES: usize = 2;

// HUFU SIGNATURE
// ================================================================================================

/// A HuFu signature over a message of at most `P::MAX_MESSAGE_BYTES` bytes.
///
/// The transmitted vector `(sig1, sig2)` of length `N + M` is kept entropy coded; the first block
/// `sig0` is recomputed by the verifier as `u - A_hat * sig1 - B * sig2 (mod Q)` with
/// `u = Hash(message || salt)`. A signature verifies against a public key if and only if the
/// payload decodes and `|sig0|^2 + |sig1|^2 + |sig2|^2 <= BOUND_SQUARE`.
///
/// ## Serialization Format
///
/// 1. Payload length (2 bytes, big-endian).
/// 2. Payload: the raw low-bit block followed by the rANS stream.
/// 3. Salt (40 bytes).
/// 4. The signed message.
///
/// [`Signature::to_padded_bytes`] extends this encoding with `0xFF` bytes to exactly
/// `P::SIG_BYTES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature<P: ParameterSet> {
    payload: Vec<u8>,
    salt: [u8; SALT_BYTES],
    message: Vec<u8>,
    _params: PhantomData<P>,
}

impl<P: ParameterSet> Signature<P> {
    // CONSTRUCTOR
    // --------------------------------------------------------------------------------------------

    /// The signer guarantees that the payload fits next to the message.
    pub(crate) fn new(payload: Vec<u8>, salt: [u8; SALT_BYTES], message: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= P::payload_budget(message.len()));
        Self { payload, salt, message, _params: PhantomData }
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the entropy coded signature vector.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the salt mixed into the message digest.
    pub fn salt(&self) -> &[u8; SALT_BYTES] {
        &self.salt
    }

    /// Returns the signed message.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    // SIGNATURE VERIFICATION
    // --------------------------------------------------------------------------------------------

    /// Returns true if this is a valid signature of its message under `pub_key`.
    pub fn verify(&self, pub_key: &PublicKey<P>) -> bool {
        self.verify_detailed(pub_key).is_ok()
    }

    /// Verifies this signature under `pub_key`.
    ///
    /// # Errors
    /// - [`RejectReason::Malformed`] if the payload does not decode to a signature vector.
    /// - [`RejectReason::NormExceeded`] if the full signature vector is too long.
    pub fn verify_detailed(&self, pub_key: &PublicKey<P>) -> Result<(), RejectReason> {
        let coefficients = decompress::<P>(&self.payload)?;
        let (sig1, sig2) = coefficients.split_at(P::N);

        let u = hash_to_syndrome::<P>(&self.message, &self.salt);
        let sig0: Vec<i64> = pub_key
            .residual(&u, sig1, sig2, BackendKind::default().backend())
            .into_iter()
            .map(|x| center_mod(x as i64, P::MODULUS))
            .collect();

        if squared_norm(&[sig0.as_slice(), coefficients.as_slice()]) > P::BOUND_SQUARE {
            return Err(RejectReason::NormExceeded);
        }
        Ok(())
    }

    // FIXED-SIZE ENCODING
    // --------------------------------------------------------------------------------------------

    /// Returns the serialized signature padded with `0xFF` to exactly `P::SIG_BYTES` bytes.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes.resize(P::SIG_BYTES, PADDING_BYTE);
        bytes
    }

    /// Parses a padded signature whose message is `message_len` bytes long.
    pub fn from_padded_bytes(
        bytes: &[u8],
        message_len: usize,
    ) -> Result<Self, DeserializationError> {
        if bytes.len() != P::SIG_BYTES {
            return Err(DeserializationError::InvalidValue(format!(
                "Failed to decode signature: expected {} bytes but got {}",
                P::SIG_BYTES,
                bytes.len()
            )));
        }

        let payload_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let end = (LENGTH_BYTES + payload_len + SALT_BYTES).saturating_add(message_len);
        if end > bytes.len() {
            return Err(DeserializationError::InvalidValue(
                "Failed to decode signature: length field runs past the end".to_string(),
            ));
        }

        let (signed, padding) = bytes.split_at(end);
        if padding.iter().any(|&b| b != PADDING_BYTE) {
            return Err(DeserializationError::InvalidValue(
                "Failed to decode signature: invalid padding".to_string(),
            ));
        }
        Self::read_from_bytes(signed)
    }
}

// SERIALIZATION / DESERIALIZATION
// ================================================================================================

impl<P: ParameterSet> Serializable for Signature<P> {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        // the payload never exceeds `P::SIG_BYTES`, which fits in a u16
        target.write_bytes(&(self.payload.len() as u16).to_be_bytes());
        target.write_bytes(&self.payload);
        target.write_bytes(&self.salt);
        target.write_bytes(&self.message);
    }

    fn get_size_hint(&self) -> usize {
        LENGTH_BYTES + self.payload.len() + SALT_BYTES + self.message.len()
    }
}

impl<P: ParameterSet> Deserializable for Signature<P> {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let payload_len = u16::from_be_bytes(source.read_array()?) as usize;
        let payload = source.read_slice(payload_len)?.to_vec();
        let salt: [u8; SALT_BYTES] = source.read_array()?;

        let mut message = Vec::new();
        while source.has_more_bytes() {
            if message.len() == P::MAX_MESSAGE_BYTES {
                return Err(DeserializationError::InvalidValue(format!(
                    "Failed to decode signature: message exceeds {} bytes",
                    P::MAX_MESSAGE_BYTES
                )));
            }
            message.push(source.read_u8()?);
        }

        if payload.len() > P::payload_budget(message.len()) {
            return Err(DeserializationError::InvalidValue(
                "Failed to decode signature: payload exceeds the signature size".to_string(),
            ));
        }

        Ok(Self { payload, salt, message, _params: PhantomData })
    }
}
