use alloc::vec::Vec;

use sha3::{
    Shake128, Shake128Reader, Shake256, Shake256Reader,
    digest::{ExtendableOutput, Update, XofReader},
};


// DOMAINS
// ================================================================================================

/// Domain separation labels for every SHAKE256 invocation made by the scheme.
///
/// Each label is absorbed before any other input, so two invocations with different domains never
/// share an output stream even when the remaining input is identical.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Splits the key generation seed into the public matrix seed and the trapdoor seed.
    KeyGen,
    /// Randomness for the ternary trapdoor entries.
    Trapdoor,
    /// Derives a fresh trapdoor seed after a failed factorization.
    Reseed,
    /// Splits a signing seed into the salt, preimage and gadget seeds.
    Signing,
    /// Stream of per-attempt salts.
    Salt,
    /// Stream feeding the perturbation (preimage) sampler.
    Preimage,
    /// Stream feeding the gadget coset sampler.
    Gadget,
    /// Message digest `Hash(message || salt)`.
    Message,
}

impl Domain {
    /// Returns the byte label absorbed ahead of the data for this domain.
    pub const fn label(self) -> &'static [u8] {
        match self {
            Domain::KeyGen => b"HuFu/keygen",
            Domain::Trapdoor => b"HuFu/trapdoor",
            Domain::Reseed => b"HuFu/reseed",
            Domain::Signing => b"HuFu/signing",
            Domain::Salt => b"HuFu/salt",
            Domain::Preimage => b"HuFu/preimage",
            Domain::Gadget => b"HuFu/gadget",
            Domain::Message => b"HuFu/message",
        }
    }
}

// SHAKE256
// ================================================================================================

/// SHAKE256 in extendable-output mode over a domain label and a sequence of byte slices.
pub struct Shake256Xof {
    reader: Shake256Reader,
}

impl Shake256Xof {
    /// Absorbs the domain label followed by every slice in `parts`, each prefixed with its
    /// length so that distinct splits of the same bytes give distinct streams.
    pub fn new(domain: Domain, parts: &[&[u8]]) -> Self {
        let mut hasher = Shake256::default();
        absorb_prefixed(&mut hasher, domain.label());
        for part in parts {
            absorb_prefixed(&mut hasher, part);
        }
        Self { reader: hasher.finalize_xof() }
    }

    /// Squeezes the next `dest.len()` bytes of the stream.
    pub fn fill(&mut self, dest: &mut [u8]) {
        self.reader.read(dest);
    }

    /// Squeezes a fixed-size array.
    pub fn squeeze<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0_u8; N];
        self.reader.read(&mut out);
        out
    }

    /// Returns `count` little-endian `u32` words reduced modulo `modulus`, a power of two.
    pub fn squeeze_words_mod(&mut self, count: usize, modulus: u32) -> Vec<u32> {
        squeeze_words_mod(&mut self.reader, count, modulus)
    }
}

/// Derives a 32-byte seed bound to `domain` from the given inputs.
pub fn derive_seed(domain: Domain, parts: &[&[u8]]) -> [u8; 32] {
    Shake256Xof::new(domain, parts).squeeze()
}

/// Reads `count` little-endian `u32` words from `reader`, masked to a power-of-two `modulus`.
fn squeeze_words_mod<R: XofReader>(reader: &mut R, count: usize, modulus: u32) -> Vec<u32> {
    debug_assert!(modulus.is_power_of_two());
    let mut buf = [0_u8; 4];
    (0..count)
        .map(|_| {
            reader.read(&mut buf);
            u32::from_le_bytes(buf) & (modulus - 1)
        })
        .collect()
}

fn absorb_prefixed(hasher: &mut Shake256, data: &[u8]) {
    hasher.update(&(data.len() as u64).to_le_bytes());
    hasher.update(data);
}

// SHAKE128
// ================================================================================================

/// SHAKE128 stream used to expand the public matrix from its seed.
pub struct Shake128Xof {
    reader: Shake128Reader,
}

impl Shake128Xof {
    /// Starts a stream over `seed`.
    pub fn new(seed: &[u8]) -> Self {
        let mut hasher = Shake128::default();
        hasher.update(seed);
        Self { reader: hasher.finalize_xof() }
    }

    /// Returns `count` little-endian `u32` words reduced modulo `modulus`, a power of two.
    pub fn squeeze_words_mod(&mut self, count: usize, modulus: u32) -> Vec<u32> {
        squeeze_words_mod(&mut self.reader, count, modulus)
    }
}
