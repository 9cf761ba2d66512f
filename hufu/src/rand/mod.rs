//! Deterministic randomness streams.
//!
//! Every randomized step of the scheme (trapdoor sampling, perturbation sampling, gadget rounding,
//! salt generation) reads from its own [SeededStream]. Streams are plain values owned by the
//! caller of a single key generation or signing call; nothing in this crate keeps generator state
//! between calls.

use rand_core::{CryptoRng, RngCore, impls};

use crate::{
    SEED_BYTES,
    hash::{Domain, Shake256Xof},
    utils::zeroize::Zeroizing,
};

// SEEDED STREAM
// ================================================================================================

/// A keyed, deterministic byte generator built on SHAKE256.
///
/// The stream for `(seed, domain)` is `SHAKE256(domain || seed)`, so streams opened on the same
/// seed under different domains are independent.
pub struct SeededStream {
    xof: Shake256Xof,
}

impl SeededStream {
    /// Opens the stream bound to `domain` for the given seed.
    pub fn new(seed: &[u8; SEED_BYTES], domain: Domain) -> Self {
        Self { xof: Shake256Xof::new(domain, &[seed]) }
    }

    /// Reads a fixed-size array from the stream.
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        self.xof.squeeze()
    }

    /// Reads a seed from the stream, wrapped so that it is cleared once dropped.
    pub fn read_seed(&mut self) -> Zeroizing<[u8; SEED_BYTES]> {
        Zeroizing::new(self.xof.squeeze())
    }
}

impl RngCore for SeededStream {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.xof.fill(dest)
    }
}

impl CryptoRng for SeededStream {}

// SEED HELPERS
// ================================================================================================

/// Draws a fresh seed from `rng`, for callers who hold a generator rather than seed material.
pub fn seed_from_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Zeroizing<[u8; SEED_BYTES]> {
    let mut seed = Zeroizing::new([0_u8; SEED_BYTES]);
    rng.fill_bytes(&mut seed[..]);
    seed
}

/// Splits `seed` into `N` independent seeds under `domain`.
pub fn split_seed<const N: usize>(
    seed: &[u8; SEED_BYTES],
    domain: Domain,
) -> [Zeroizing<[u8; SEED_BYTES]>; N] {
    let mut stream = SeededStream::new(seed, domain);
    core::array::from_fn(|_| stream.read_seed())
}

// TESTS
// ================================================================================================
