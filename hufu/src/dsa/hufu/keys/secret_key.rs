use alloc::{string::ToString, vec::Vec};
use core::fmt;

use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, trace};

use super::{
    super::{
        ByteReader, ByteWriter, Config, Deserializable, DeserializationError, EncodingError,
        KeyGenError, ParameterSet, SALT_BYTES, SamplerError, Serializable, Signature,
        SigningError,
        encoding::compress,
        hash_to_syndrome::hash_to_syndrome,
        math::{
            Backend, BackendKind, CholeskyTriple, GadgetSample, GaussianSampler, Matrix,
            TrapdoorMatrix, TriangularMatrix, center_mod, generate_trapdoor, packed_size,
            round_to_gadget, sample_preimage,
        },
        squared_norm,
    },
    PublicKey, compute_b, expand_public_matrix,
};
use crate::{
    SEED_BYTES,
    hash::Domain,
    rand::{SeededStream, seed_from_rng, split_seed},
    utils::{
        SliceReader, pack_lanes, unpack_lanes,
        zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing},
    },
};

// SECRET KEY
// ================================================================================================

/// Secret key of the HuFu signature scheme for the parameter set `P`.
///
/// The key holds the public key, the ternary trapdoor `R = [E; S]` satisfying
/// `[I | A_hat | B] * [E; S; I] = p * I (mod Q)`, and the Cholesky factors used to sample
/// perturbations. It never changes after key generation, so a single key can sign from several
/// threads at once as long as every call is given its own seed.
#[derive(Clone)]
pub struct SecretKey<P: ParameterSet> {
    public_key: PublicKey<P>,
    trapdoor: TrapdoorMatrix,
    cholesky: CholeskyTriple,
}

impl<P: ParameterSet> SecretKey<P> {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Generates a secret key from OS-provided randomness.
    #[cfg(feature = "std")]
    pub fn new() -> Result<Self, KeyGenError> {
        let mut rng = rand::rng();
        Self::with_rng(&mut rng)
    }

    /// Generates a secret key from a seed drawn from `rng`, using the default [Config].
    ///
    /// # Security Requirements
    ///
    /// The provided RNG must be cryptographically secure. The whole key is a deterministic
    /// function of the 32 bytes drawn here.
    pub fn with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, KeyGenError> {
        let seed = seed_from_rng(rng);
        Self::with_seed(&seed, &Config::default())
    }

    /// Deterministically generates a secret key from a 32-byte master seed.
    ///
    /// The seed is split into the seed of `A_hat` and the trapdoor seed. Trapdoors whose
    /// covariance cannot be factored are replaced, at most [`Config::max_keygen_attempts`] times.
    pub fn with_seed(seed: &[u8; SEED_BYTES], config: &Config) -> Result<Self, KeyGenError> {
        let [seed_a, trapdoor_seed] = split_seed::<2>(seed, Domain::KeyGen);
        let (trapdoor, cholesky) = generate_trapdoor::<P>(&trapdoor_seed, config)?;

        let a_hat = expand_public_matrix::<P>(&seed_a);
        let b = compute_b::<P>(&a_hat, &trapdoor, config.backend().backend());
        let public_key = PublicKey::from_parts(*seed_a, a_hat, b);

        Ok(Self { public_key, trapdoor, cholesky })
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the public key corresponding to this secret key.
    pub fn public_key(&self) -> PublicKey<P> {
        self.public_key.clone()
    }

    /// Returns the trapdoor `R = [E; S]`.
    pub fn trapdoor(&self) -> &TrapdoorMatrix {
        &self.trapdoor
    }

    /// Returns the scaled Cholesky factors of the perturbation covariance.
    pub fn cholesky(&self) -> &CholeskyTriple {
        &self.cholesky
    }

    // SIGNATURE GENERATION
    // --------------------------------------------------------------------------------------------

    /// Signs `message` with a seed drawn from OS-provided randomness and the default [Config].
    #[cfg(feature = "std")]
    pub fn sign(&self, message: &[u8]) -> Result<Signature<P>, SigningError> {
        let mut rng = rand::rng();
        self.sign_with_rng(message, &mut rng)
    }

    /// Signs `message` with a seed drawn from `rng` and the default [Config].
    pub fn sign_with_rng<R: RngCore + CryptoRng>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<Signature<P>, SigningError> {
        let seed = seed_from_rng(rng);
        self.sign_with_seed(message, &seed, &Config::default())
    }

    /// Signs `message`, drawing all randomness from `seed`.
    ///
    /// The seed is split into salt, perturbation and gadget streams. Every attempt draws a fresh
    /// salt and fresh samples from those streams, and an attempt is discarded when the candidate
    /// signature is too long, fails to encode, or when a capped sampler runs out of trials.
    ///
    /// Signing twice with the same seed yields the same signature. Reusing a seed for different
    /// messages leaks information about the trapdoor, so production callers must supply fresh
    /// seeds.
    ///
    /// # Errors
    /// - [`SigningError::MessageTooLong`] if `message` exceeds `P::MAX_MESSAGE_BYTES`.
    /// - [`SigningError::SigningFailed`] if [`Config::max_signing_attempts`] attempts were all
    ///   rejected.
    pub fn sign_with_seed(
        &self,
        message: &[u8],
        seed: &[u8; SEED_BYTES],
        config: &Config,
    ) -> Result<Signature<P>, SigningError> {
        if message.len() > P::MAX_MESSAGE_BYTES {
            return Err(SigningError::MessageTooLong {
                len: message.len(),
                max: P::MAX_MESSAGE_BYTES,
            });
        }

        let backend = config.backend().backend();
        let sampler = GaussianSampler::new(config.max_sampler_trials());
        let [salt_seed, preimage_seed, gadget_seed] = split_seed::<3>(seed, Domain::Signing);
        let mut streams = SigningStreams {
            salt: SeededStream::new(&salt_seed, Domain::Salt),
            preimage: SeededStream::new(&preimage_seed, Domain::Preimage),
            gadget: SeededStream::new(&gadget_seed, Domain::Gadget),
        };

        for attempt in 1..=config.max_signing_attempts() {
            let salt: [u8; SALT_BYTES] = streams.salt.read_array();
            match self.sign_attempt(message, &salt, &sampler, &mut streams, backend) {
                Ok((payload, norm)) => {
                    trace!(
                        set = P::NAME,
                        backend = backend.name(),
                        attempt,
                        norm,
                        len = payload.len(),
                        "signature accepted"
                    );
                    return Ok(Signature::new(payload, salt, message.to_vec()));
                },
                Err(reason) => {
                    debug!(set = P::NAME, attempt, %reason, "signing attempt rejected");
                },
            }
        }

        Err(SigningError::SigningFailed { attempts: config.max_signing_attempts() })
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Runs one attempt of the rejection loop, returning the encoded payload and the squared norm
    /// of the full signature vector.
    fn sign_attempt(
        &self,
        message: &[u8],
        salt: &[u8; SALT_BYTES],
        sampler: &GaussianSampler,
        streams: &mut SigningStreams,
        backend: &dyn Backend,
    ) -> Result<(Vec<u8>, u64), Rejection> {
        let modulus = P::MODULUS;
        let u = hash_to_syndrome::<P>(message, salt);

        let p = sample_preimage::<P, _>(
            &self.trapdoor,
            &self.cholesky,
            sampler,
            &mut streams.preimage,
        )?;

        // v = u - p0 - A_hat * p1 - B * p2 (mod Q)
        let v: Vec<u32> = self
            .public_key
            .residual(&u, &p.p1, &p.p2, backend)
            .iter()
            .zip(&p.p0)
            .map(|(&r, &p0)| (r as i64 - p0).rem_euclid(modulus as i64) as u32)
            .collect();

        let GadgetSample { z, error } = round_to_gadget::<P, _>(&v, &mut streams.gadget);
        let z = Zeroizing::new(z);
        let s_z = Zeroizing::new(backend.mul_vec_small(self.trapdoor.s(), &z));
        let e_z = Zeroizing::new(backend.mul_vec_small(self.trapdoor.e(), &z));

        let sig0: Vec<i64> = (0..P::M)
            .map(|i| center_mod(p.p0[i] + e_z[i] + error[i], modulus))
            .collect();
        let mut coefficients = Vec::with_capacity(P::SIG_LEN);
        coefficients.extend(p.p1.iter().zip(s_z.iter()).map(|(a, b)| a + b));
        coefficients.extend(p.p2.iter().zip(z.iter()).map(|(a, b)| a + b));

        let norm = squared_norm(&[sig0.as_slice(), coefficients.as_slice()]);
        if norm > P::BOUND_SQUARE {
            return Err(Rejection::NormExceeded { norm });
        }

        let payload = compress::<P>(&coefficients)?;
        let budget = P::payload_budget(message.len());
        if payload.len() > budget {
            return Err(Rejection::PayloadTooLong { len: payload.len(), budget });
        }
        Ok((payload, norm))
    }
}

impl<P: ParameterSet> Zeroize for SecretKey<P> {
    fn zeroize(&mut self) {
        self.trapdoor.zeroize();
        self.cholesky.zeroize();
    }
}

// Manual Drop implementation to ensure zeroization on drop.
impl<P: ParameterSet> Drop for SecretKey<P> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<P: ParameterSet> ZeroizeOnDrop for SecretKey<P> {}

impl<P: ParameterSet> fmt::Debug for SecretKey<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<elided secret for SecretKey>")
    }
}

impl<P: ParameterSet> fmt::Display for SecretKey<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<elided secret for SecretKey>")
    }
}

impl<P: ParameterSet> PartialEq for SecretKey<P> {
    fn eq(&self, other: &Self) -> bool {
        let ours = Zeroizing::new(self.to_bytes());
        let theirs = Zeroizing::new(other.to_bytes());
        ours.ct_eq(&theirs).into()
    }
}

impl<P: ParameterSet> Eq for SecretKey<P> {}

// SIGNING STREAMS
// ================================================================================================

/// The three randomness streams of one signing call; they persist across attempts.
struct SigningStreams {
    salt: SeededStream,
    preimage: SeededStream,
    gadget: SeededStream,
}

/// Why a signing attempt was discarded.
#[derive(Debug, Error)]
enum Rejection {
    #[error("squared norm {norm} exceeds the bound")]
    NormExceeded { norm: u64 },
    #[error("payload of {len} bytes exceeds the budget of {budget} bytes")]
    PayloadTooLong { len: usize, budget: usize },
    #[error("signature vector cannot be encoded: {0}")]
    Encoding(#[from] EncodingError),
    #[error("perturbation sampling failed: {0}")]
    Sampler(#[from] SamplerError),
}

// SERIALIZATION
// ================================================================================================

/// Lane value of a ternary trapdoor entry; the value 2 is never produced.
fn ternary_to_lane(x: i8) -> u32 {
    match x {
        -1 => 3,
        x => x as u32,
    }
}

impl<P: ParameterSet> Serializable for SecretKey<P> {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        self.public_key.write_into(target);

        let lanes: Zeroizing<Vec<u32>> =
            Zeroizing::new(self.trapdoor.entries().map(ternary_to_lane).collect());
        let mut packed = Zeroizing::new(Vec::with_capacity(P::TRAPDOOR_BYTES));
        pack_lanes(&lanes, 2, &mut packed);
        target.write_bytes(&packed);

        let floats = self
            .cholesky
            .l22()
            .as_packed()
            .iter()
            .chain(self.cholesky.l32().as_slice())
            .chain(self.cholesky.l33().as_packed());
        for x in floats {
            target.write_bytes(&x.to_le_bytes());
        }
    }

    fn get_size_hint(&self) -> usize {
        P::SK_BYTES
    }
}

impl<P: ParameterSet> Deserializable for SecretKey<P> {
    fn read_from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let mut source = SliceReader::new(bytes);
        let key = Self::read_from(&mut source)?;
        if source.has_more_bytes() {
            return Err(DeserializationError::UnconsumedBytes);
        }
        Ok(key)
    }

    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let public_key = PublicKey::<P>::read_from(source)?;

        let count = (P::M + P::N) * P::M;
        let packed = source.read_slice(P::TRAPDOOR_BYTES)?;
        let lanes = Zeroizing::new(unpack_lanes(packed, 2, count).map_err(|err| {
            DeserializationError::InvalidValue(format!("Failed to decode trapdoor: {err}"))
        })?);
        let mut entries: Zeroizing<Vec<i8>> = Zeroizing::new(Vec::with_capacity(count));
        for &lane in lanes.iter() {
            entries.push(match lane {
                0 => 0,
                1 => 1,
                3 => -1,
                _ => {
                    return Err(DeserializationError::InvalidValue(
                        "Failed to decode trapdoor: invalid ternary lane".to_string(),
                    ));
                },
            });
        }
        let trapdoor = TrapdoorMatrix::from_entries::<P>(&entries);

        let l22 = read_floats(source, packed_size(P::N))?;
        let l32 = read_floats(source, P::M * P::N)?;
        let l33 = read_floats(source, packed_size(P::M))?;
        let cholesky = TriangularMatrix::from_packed(P::N, l22)
            .and_then(|l22| {
                let l32 = Matrix::from_vec(P::M, P::N, l32)?;
                let l33 = TriangularMatrix::from_packed(P::M, l33)?;
                CholeskyTriple::from_parts::<P>(l22, l32, l33)
            })
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))?;

        // the trapdoor must be the one behind `B`
        let expected_b =
            compute_b::<P>(public_key.a_hat(), &trapdoor, BackendKind::default().backend());
        if expected_b != *public_key.b() {
            return Err(DeserializationError::InvalidValue(
                "Failed to decode secret key: trapdoor does not match the public key".to_string(),
            ));
        }

        Ok(Self { public_key, trapdoor, cholesky })
    }
}

/// Reads `count` little-endian `f64` values, rejecting NaN and infinities.
fn read_floats<R: ByteReader>(
    source: &mut R,
    count: usize,
) -> Result<Vec<f64>, DeserializationError> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = f64::from_le_bytes(source.read_array()?);
        if !value.is_finite() {
            values.zeroize();
            return Err(DeserializationError::InvalidValue(
                "Failed to decode secret key: non-finite Cholesky entry".to_string(),
            ));
        }
        values.push(value);
    }
    Ok(values)
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::dsa::hufu::params::Toy;

    fn toy_key() -> SecretKey<Toy> {
        SecretKey::with_seed(&[0x42; SEED_BYTES], &Config::default()).unwrap()
    }

    #[test]
    fn ternary_lanes() {
        assert_eq!([-1, 0, 1].map(ternary_to_lane), [3, 0, 1]);
    }

    #[test]
    fn key_generation_is_deterministic() {
        let sk = toy_key();
        let again = toy_key();
        assert_eq!(sk, again);
        assert_eq!(sk.public_key(), again.public_key());

        let other = SecretKey::<Toy>::with_seed(&[0x43; SEED_BYTES], &Config::default()).unwrap();
        assert_ne!(sk, other);
    }

    #[test]
    fn trapdoor_spans_the_gadget() {
        // [I | A_hat | B] * [E; S; I] = p * I (mod Q)
        let sk = toy_key();
        let pk = sk.public_key();
        let (e, s) = (sk.trapdoor().e(), sk.trapdoor().s());
        for i in 0..Toy::M {
            for j in 0..Toy::M {
                let a_s: i64 = (0..Toy::N)
                    .map(|k| pk.a_hat().row(i)[k] as i64 * s.row(k)[j] as i64)
                    .sum();
                let total = e.row(i)[j] as i64 + a_s + pk.b().row(i)[j] as i64;
                let expected = if i == j { Toy::GADGET_BASE as i64 } else { 0 };
                assert_eq!(total.rem_euclid(Toy::MODULUS as i64), expected, "({i}, {j})");
            }
        }
    }

    #[test]
    fn signer_and_verifier_agree_on_the_norm() {
        let sk = toy_key();
        let pk = sk.public_key();
        let backend = BackendKind::Scalar.backend();
        let sampler = GaussianSampler::default();
        let mut streams = SigningStreams {
            salt: SeededStream::new(&[1; SEED_BYTES], Domain::Salt),
            preimage: SeededStream::new(&[2; SEED_BYTES], Domain::Preimage),
            gadget: SeededStream::new(&[3; SEED_BYTES], Domain::Gadget),
        };

        let mut checked = 0;
        for _ in 0..20 {
            let salt: [u8; SALT_BYTES] = streams.salt.read_array();
            let Ok((payload, norm)) =
                sk.sign_attempt(b"Hello", &salt, &sampler, &mut streams, backend)
            else {
                continue;
            };

            let coefficients = crate::dsa::hufu::decompress::<Toy>(&payload).unwrap();
            let (sig1, sig2) = coefficients.split_at(Toy::N);
            let u = hash_to_syndrome::<Toy>(b"Hello", &salt);
            let sig0: Vec<i64> = pk
                .residual(&u, sig1, sig2, backend)
                .into_iter()
                .map(|x| center_mod(x as i64, Toy::MODULUS))
                .collect();
            assert_eq!(squared_norm(&[sig0.as_slice(), coefficients.as_slice()]), norm);
            checked += 1;
        }
        assert!(checked > 0);
    }

    #[test]
    fn serialized_key_has_the_advertised_size() {
        let sk = toy_key();
        let bytes = sk.to_bytes();
        assert_eq!(bytes.len(), Toy::SK_BYTES);
        assert_eq!(SecretKey::<Toy>::read_from_bytes(&bytes).unwrap(), sk);
    }

    #[test]
    fn invalid_secret_keys_are_rejected() {
        let sk = toy_key();
        let bytes = sk.to_bytes();

        // a lane value of 2 in the first trapdoor byte
        let mut bad_lane = bytes.clone();
        bad_lane[Toy::PK_BYTES] = 0b10;
        assert_matches!(
            SecretKey::<Toy>::read_from_bytes(&bad_lane),
            Err(DeserializationError::InvalidValue(_))
        );

        // a NaN as the first Cholesky entry
        let mut nan = bytes.clone();
        let offset = Toy::PK_BYTES + Toy::TRAPDOOR_BYTES;
        nan[offset..offset + 8].copy_from_slice(&f64::NAN.to_le_bytes());
        assert_matches!(
            SecretKey::<Toy>::read_from_bytes(&nan),
            Err(DeserializationError::InvalidValue(_))
        );

        // flipping a trapdoor entry breaks the relation with B
        let mut flipped = bytes.clone();
        let lane = flipped[Toy::PK_BYTES] & 0b11;
        flipped[Toy::PK_BYTES] ^= lane ^ if lane == 1 { 0 } else { 1 };
        assert_matches!(
            SecretKey::<Toy>::read_from_bytes(&flipped),
            Err(DeserializationError::InvalidValue(_))
        );

        assert!(SecretKey::<Toy>::read_from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut extended = bytes.clone();
        extended.extend_from_slice(&[1, 2, 3]);
        assert_matches!(
            SecretKey::<Toy>::read_from_bytes(&extended),
            Err(DeserializationError::UnconsumedBytes)
        );
    }
}
