use alloc::vec::Vec;

use assert_matches::assert_matches;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

use super::{
    Config, HuFu1, HuFu3, HuFu5, ParameterSet, PublicKey, RejectReason, SALT_BYTES, SecretKey, Signature,
    SigningError, compress, keypair, params::Toy, sign, verify,
};
use crate::{
    SEED_BYTES,
    utils::{Deserializable, DeserializationError, Serializable},
};

/// The fixed seed `[0x00, 0x01, ..., 0x1F]`.
fn counting_seed() -> [u8; SEED_BYTES] {
    core::array::from_fn(|i| i as u8)
}

fn toy_keys(seed: u8) -> (PublicKey<Toy>, SecretKey<Toy>) {
    keypair::<Toy>(&[seed; SEED_BYTES], &Config::default()).unwrap()
}

// SIGN / VERIFY
// ================================================================================================

#[test]
fn test_sign_and_verify() {
    let (pk, sk) = toy_keys(1);

    for len in [0, 1, 5, 33, Toy::MAX_MESSAGE_BYTES] {
        let message: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
        let signature = sign(&sk, &message, &[len as u8; SEED_BYTES], &Config::default()).unwrap();

        assert_eq!(signature.message(), &message[..]);
        assert!(verify(&pk, &signature), "message of {len} bytes");
        assert_eq!(pk.verify_detailed(&signature), Ok(()));
        assert!(signature.verify(&pk));
    }
}

#[test]
fn signature_does_not_verify_for_another_message_or_key() {
    let (pk, sk) = toy_keys(2);
    let signature = sk.sign_with_seed(b"Hello", &[3; SEED_BYTES], &Config::default()).unwrap();
    assert!(pk.verify(&signature));

    let forged = Signature::<Toy>::new(
        signature.payload().to_vec(),
        *signature.salt(),
        b"Hellp".to_vec(),
    );
    assert_eq!(pk.verify_detailed(&forged), Err(RejectReason::NormExceeded));

    let (other_pk, _) = toy_keys(3);
    assert!(!other_pk.verify(&signature));
}

#[test]
fn hufu1_end_to_end() {
    let mut rng = ChaCha20Rng::from_seed([7; 32]);
    let sk = SecretKey::<HuFu1>::with_rng(&mut rng).unwrap();
    let pk = sk.public_key();

    let signature = sk.sign_with_rng(b"Hello", &mut rng).unwrap();
    assert!(pk.verify(&signature));

    let padded = signature.to_padded_bytes();
    assert_eq!(padded.len(), HuFu1::SIG_BYTES);
    let decoded = Signature::<HuFu1>::from_padded_bytes(&padded, 5).unwrap();
    assert_eq!(decoded, signature);
    assert!(pk.verify(&decoded));

    let pk_bytes = pk.to_bytes();
    assert_eq!(pk_bytes.len(), HuFu1::PK_BYTES);
    assert!(PublicKey::<HuFu1>::read_from_bytes(&pk_bytes).unwrap().verify(&signature));
}

/// Signs messages of the maximum length, where the payload budget is tightest, and checks them
/// through the padded encoding.
fn max_length_messages_verify<P: ParameterSet>() {
    let sk = SecretKey::<P>::with_seed(&[0x11; SEED_BYTES], &Config::default()).unwrap();
    let pk = sk.public_key();

    for i in 0..3_u8 {
        let message = [i; 64];
        assert_eq!(message.len(), P::MAX_MESSAGE_BYTES);
        let signature = sk.sign_with_seed(&message, &[i; SEED_BYTES], &Config::default()).unwrap();
        assert!(signature.payload().len() <= P::payload_budget(message.len()), "{}", P::NAME);

        let padded = signature.to_padded_bytes();
        assert_eq!(padded.len(), P::SIG_BYTES);
        let decoded = Signature::<P>::from_padded_bytes(&padded, message.len()).unwrap();
        assert_eq!(decoded, signature);
        assert!(pk.verify(&decoded), "{}", P::NAME);
    }
}

#[rstest]
#[case::hufu1(max_length_messages_verify::<HuFu1>)]
#[case::hufu3(max_length_messages_verify::<HuFu3>)]
#[case::hufu5(max_length_messages_verify::<HuFu5>)]
fn test_max_length_messages(#[case] check: fn()) {
    check();
}

// DETERMINISM
// ================================================================================================

#[test]
fn test_signature_determinism() {
    let seed = counting_seed();
    let (pk, sk) = keypair::<Toy>(&seed, &Config::default()).unwrap();

    let first = sk.sign_with_seed(b"Hello", &seed, &Config::default()).unwrap();
    let second = sk.sign_with_seed(b"Hello", &seed, &Config::default()).unwrap();
    assert_eq!(first.to_padded_bytes(), second.to_padded_bytes());
    assert!(pk.verify(&first));

    // keys are reproducible from the same seed as well
    let (pk_again, sk_again) = keypair::<Toy>(&seed, &Config::default()).unwrap();
    assert_eq!(pk_again, pk);
    assert_eq!(sk_again, sk);

    let mut other_seed = seed;
    other_seed[0] ^= 1;
    let third = sk.sign_with_seed(b"Hello", &other_seed, &Config::default()).unwrap();
    assert_ne!(third.salt(), first.salt());
}

#[cfg(feature = "concurrent")]
#[test]
fn backends_produce_identical_keys_and_signatures() {
    use super::BackendKind;

    let seed = counting_seed();
    let scalar = Config::default().with_backend(BackendKind::Scalar);
    let parallel = Config::default().with_backend(BackendKind::Parallel);

    let (_, sk_scalar) = keypair::<Toy>(&seed, &scalar).unwrap();
    let (_, sk_parallel) = keypair::<Toy>(&seed, &parallel).unwrap();
    assert_eq!(sk_scalar, sk_parallel);

    let a = sk_scalar.sign_with_seed(b"Hello", &seed, &scalar).unwrap();
    let b = sk_scalar.sign_with_seed(b"Hello", &seed, &parallel).unwrap();
    assert_eq!(a, b);
}

#[cfg(feature = "std")]
#[test]
fn signing_from_many_threads() {
    let (pk, sk) = toy_keys(4);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4_u8)
            .map(|t| {
                let (pk, sk) = (&pk, &sk);
                scope.spawn(move || {
                    let signature =
                        sk.sign_with_seed(&[t], &[t; SEED_BYTES], &Config::default()).unwrap();
                    pk.verify(&signature)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

// SIGNING FAILURES
// ================================================================================================

#[test]
fn long_messages_are_refused() {
    let (_, sk) = toy_keys(5);
    let message = vec![0_u8; Toy::MAX_MESSAGE_BYTES + 1];
    assert_eq!(
        sk.sign_with_seed(&message, &[0; SEED_BYTES], &Config::default()),
        Err(SigningError::MessageTooLong {
            len: Toy::MAX_MESSAGE_BYTES + 1,
            max: Toy::MAX_MESSAGE_BYTES
        })
    );
}

#[test]
fn exhausted_signing_reports_the_attempts() {
    let (_, sk) = toy_keys(6);
    // every perturbation needs dozens of single-trial draws to succeed in a row
    let config = Config::default().with_max_signing_attempts(3).with_max_sampler_trials(Some(1));
    assert_matches!(
        sk.sign_with_seed(b"Hello", &[0; SEED_BYTES], &config),
        Err(SigningError::SigningFailed { attempts: 3 })
    );
}

// MALFORMED SIGNATURES
// ================================================================================================

#[test]
fn malformed_payloads_are_rejected() {
    let (pk, sk) = toy_keys(7);
    let signature = sk.sign_with_seed(b"Hello", &[1; SEED_BYTES], &Config::default()).unwrap();
    let payload = signature.payload();

    let truncated = Signature::<Toy>::new(
        payload[..payload.len() - 1].to_vec(),
        *signature.salt(),
        b"Hello".to_vec(),
    );
    assert_eq!(pk.verify_detailed(&truncated), Err(RejectReason::Malformed));

    let empty = Signature::<Toy>::new(Vec::new(), *signature.salt(), b"Hello".to_vec());
    assert_eq!(pk.verify_detailed(&empty), Err(RejectReason::Malformed));
}

#[test]
fn long_vectors_are_rejected() {
    let (pk, _) = toy_keys(8);
    let max = ((Toy::ALPHABET as i64) << Toy::KEEP_BITS) - 1;
    let coefficients = vec![max; Toy::SIG_LEN];
    let payload = compress::<Toy>(&coefficients).unwrap();
    let signature = Signature::<Toy>::new(payload, [0; SALT_BYTES], Vec::new());
    assert_eq!(pk.verify_detailed(&signature), Err(RejectReason::NormExceeded));
}

// SERIALIZATION
// ================================================================================================

#[test]
fn test_signature_serialization() {
    let (pk, sk) = toy_keys(9);
    // a message ending in the padding byte still parses once its length is known
    let message = [0x10, 0xff, 0xff];
    let signature = sk.sign_with_seed(&message, &[2; SEED_BYTES], &Config::default()).unwrap();

    let bytes = signature.to_bytes();
    assert_eq!(bytes.len(), 2 + signature.payload().len() + SALT_BYTES + message.len());
    assert_eq!(&bytes[..2], &(signature.payload().len() as u16).to_be_bytes());
    let decoded = Signature::<Toy>::read_from_bytes(&bytes).unwrap();
    assert_eq!(decoded, signature);
    assert!(pk.verify(&decoded));

    let padded = signature.to_padded_bytes();
    assert_eq!(padded.len(), Toy::SIG_BYTES);
    assert_eq!(Signature::<Toy>::from_padded_bytes(&padded, message.len()).unwrap(), signature);

    // wrong total size, dirty padding and an oversized length field
    assert_matches!(
        Signature::<Toy>::from_padded_bytes(&padded[..padded.len() - 1], message.len()),
        Err(DeserializationError::InvalidValue(_))
    );
    let mut dirty = padded.clone();
    let last = dirty.len() - 1;
    dirty[last] = 0;
    assert_matches!(
        Signature::<Toy>::from_padded_bytes(&dirty, message.len()),
        Err(DeserializationError::InvalidValue(_))
    );
    let mut overlong = padded.clone();
    overlong[..2].copy_from_slice(&u16::MAX.to_be_bytes());
    assert_matches!(
        Signature::<Toy>::from_padded_bytes(&overlong, message.len()),
        Err(DeserializationError::InvalidValue(_))
    );
    assert!(Signature::<Toy>::from_padded_bytes(&padded, usize::MAX).is_err());
}

#[test]
fn oversized_messages_do_not_deserialize() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0_u16.to_be_bytes());
    bytes.extend_from_slice(&[0; SALT_BYTES]);
    bytes.extend_from_slice(&[0; Toy::MAX_MESSAGE_BYTES + 1]);
    assert!(Signature::<Toy>::read_from_bytes(&bytes).is_err());
}

#[test]
fn test_secret_key_debug_redaction() {
    let (_, sk) = toy_keys(10);
    assert_eq!(format!("{sk:?}"), "<elided secret for SecretKey>");
    assert_eq!(format!("{sk}"), "<elided secret for SecretKey>");
}

// TAMPERING
// ================================================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn flipped_bits_are_detected(key_seed in any::<u8>(), position in any::<usize>(), bit in 0_u8..8) {
        let (pk, sk) = toy_keys(key_seed);
        let signature =
            sk.sign_with_seed(b"Hello", &[key_seed; SEED_BYTES], &Config::default()).unwrap();

        // flip one bit of the payload or of the salt
        let mut payload = signature.payload().to_vec();
        let mut salt = *signature.salt();
        let index = position % (payload.len() + SALT_BYTES);
        if index < payload.len() {
            payload[index] ^= 1 << bit;
        } else {
            salt[index - payload.len()] ^= 1 << bit;
        }

        let tampered = Signature::<Toy>::new(payload, salt, b"Hello".to_vec());
        prop_assert!(!pk.verify(&tampered));
    }
}
