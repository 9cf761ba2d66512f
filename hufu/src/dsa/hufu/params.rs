//! Parameter sets of the HuFu signature scheme.
//!
//! A parameter set is a zero-sized marker type implementing [ParameterSet]; keys and signatures
//! are generic over it so that a key for one security level can never be used with another.

use core::fmt::Debug;

use crate::{SEED_BYTES, utils::packed_len};

// SHARED CONSTANTS
// ================================================================================================

/// The small modulus `q`; the full modulus of every parameter set is `Q = p * q`.
pub const SMALL_MODULUS: u32 = 16;

/// Length of the per-signature salt.
pub const SALT_BYTES: usize = 40;

/// Smoothing width `r = sqrt(50 ln 2) / (pi sqrt 2)`.
///
/// This is the width of every integer Gaussian drawn by the scheme and the width of the base
/// half-Gaussian table.
pub const SMOOTHING: f64 = 1.325_051_817_596_984_4;

/// `1 / (2 r^2)`.
pub(crate) const INV_2_SMOOTHING_SQ: f64 = 0.284_776_586_499_750_1;

/// Precision of the static rANS frequency tables.
pub const RANS_SCALE_BITS: u32 = 12;

// PARAMETER SET
// ================================================================================================

/// Compile-time description of one HuFu security level.
pub trait ParameterSet:
    Copy + Clone + Debug + Default + PartialEq + Eq + Send + Sync + 'static
{
    /// Human readable name of the set.
    const NAME: &'static str;

    /// Number of rows of the public matrix (and of the syndrome).
    const M: usize;

    /// Number of columns of `A_hat`.
    const N: usize;

    /// Gadget base `p`.
    const GADGET_BASE: u32;

    /// Public modulus `Q = p * q`, a power of two.
    const MODULUS: u32;

    /// Bit width of one packed entry of `B`.
    const MODULUS_BITS: u32;

    /// Width `s` of the signature distribution.
    const SIGMA: f64;

    /// Largest accepted squared Euclidean norm of a signature.
    const BOUND_SQUARE: u64;

    /// Number of low bits of each coefficient stored raw by the entropy coder.
    const KEEP_BITS: u32;

    /// rANS frequencies of `|x| >> KEEP_BITS`, summing to `2^RANS_SCALE_BITS`.
    const FREQUENCIES: &'static [u16];

    /// Size of a signed message once padded.
    const SIG_BYTES: usize;

    /// Longest message accepted by the signer.
    const MAX_MESSAGE_BYTES: usize;

    // DERIVED CONSTANTS
    // --------------------------------------------------------------------------------------------

    /// Number of symbols the entropy coder can represent.
    const ALPHABET: usize = Self::FREQUENCIES.len();

    /// Number of transmitted signature coefficients.
    const SIG_LEN: usize = Self::N + Self::M;

    /// Size of the raw (low bits and sign) block of an encoded signature.
    const RAW_BYTES: usize = packed_len(Self::SIG_LEN, Self::KEEP_BITS + 1);

    /// Size of a serialized public key.
    const PK_BYTES: usize = SEED_BYTES + packed_len(Self::M * Self::M, Self::MODULUS_BITS);

    /// Size of the packed ternary trapdoor.
    const TRAPDOOR_BYTES: usize = packed_len((Self::M + Self::N) * Self::M, 2);

    /// Number of floats stored for the Cholesky factors.
    const CHOLESKY_FLOATS: usize =
        Self::N * (Self::N + 1) / 2 + Self::M * Self::N + Self::M * (Self::M + 1) / 2;

    /// Size of a serialized secret key.
    const SK_BYTES: usize = Self::PK_BYTES + Self::TRAPDOOR_BYTES + 8 * Self::CHOLESKY_FLOATS;

    /// Largest payload which fits next to a message of `message_len` bytes.
    fn payload_budget(message_len: usize) -> usize {
        Self::SIG_BYTES.saturating_sub(2 + SALT_BYTES + message_len)
    }

    /// `sigma'^2 = (s^2 - r^2) / (q r)^2`.
    fn sigma_prime_sq() -> f64 {
        let qr = SMALL_MODULUS as f64 * SMOOTHING;
        (Self::SIGMA * Self::SIGMA - SMOOTHING * SMOOTHING) / (qr * qr)
    }
}

// HUFU-1
// ================================================================================================

/// NIST level 1 parameters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HuFu1;

impl ParameterSet for HuFu1 {
    const NAME: &'static str = "HuFu-1";
    const M: usize = 736;
    const N: usize = 848;
    const GADGET_BASE: u32 = 1 << 12;
    const MODULUS: u32 = 1 << 16;
    const MODULUS_BITS: u32 = 16;
    const SIGMA: f64 = 1055.6;
    const BOUND_SQUARE: u64 = 3_909_000_484;
    const KEEP_BITS: u32 = 7;
    const FREQUENCIES: &'static [u16] = &HUFU1_FREQUENCIES;
    const SIG_BYTES: usize = 2560;
    const MAX_MESSAGE_BYTES: usize = 64;
}

#[rustfmt::skip]
const HUFU1_FREQUENCIES: [u16; 83] = [
    342, 390, 378, 362, 341, 317, 291, 262, 233, 204, 176, 150, 126, 104, 85, 68, 54, 42, 32, 24,
    18, 13, 10, 7, 5, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

// HUFU-3
// ================================================================================================

/// NIST level 3 parameters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HuFu3;

impl ParameterSet for HuFu3 {
    const NAME: &'static str = "HuFu-3";
    const M: usize = 1024;
    const N: usize = 1232;
    const GADGET_BASE: u32 = 1 << 13;
    const MODULUS: u32 = 1 << 17;
    const MODULUS_BITS: u32 = 17;
    const SIGMA: f64 = 1253.8;
    const BOUND_SQUARE: u64 = 11_770_731_049;
    const KEEP_BITS: u32 = 7;
    const FREQUENCIES: &'static [u16] = &HUFU3_FREQUENCIES;
    const SIG_BYTES: usize = 3664;
    const MAX_MESSAGE_BYTES: usize = 64;
}

#[rustfmt::skip]
const HUFU3_FREQUENCIES: [u16; 98] = [
    266, 330, 323, 313, 300, 285, 268, 249, 229, 209, 188, 168, 148, 129, 112, 96, 81, 68, 56, 46,
    37, 30, 24, 19, 15, 11, 9, 7, 5, 4, 3, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

// HUFU-5
// ================================================================================================

/// NIST level 5 parameters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HuFu5;

impl ParameterSet for HuFu5 {
    const NAME: &'static str = "HuFu-5";
    const M: usize = 1312;
    const N: usize = 1552;
    const GADGET_BASE: u32 = 1 << 13;
    const MODULUS: u32 = 1 << 17;
    const MODULUS_BITS: u32 = 17;
    const SIGMA: f64 = 1415.3;
    const BOUND_SQUARE: u64 = 16_983_302_400;
    const KEEP_BITS: u32 = 7;
    const FREQUENCIES: &'static [u16] = &HUFU5_FREQUENCIES;
    const SIG_BYTES: usize = 4672;
    const MAX_MESSAGE_BYTES: usize = 64;
}

#[rustfmt::skip]
const HUFU5_FREQUENCIES: [u16; 111] = [
    225, 293, 288, 281, 272, 261, 249, 235, 220, 204, 188, 172, 156, 140, 125, 111, 97, 85, 73, 62,
    53, 45, 37, 31, 25, 21, 17, 13, 11, 8, 7, 5, 4, 3, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

// TEST PARAMETERS
// ================================================================================================

/// A miniature parameter set derived with the same formulas as the real ones.
///
/// Its matrices are small enough that key generation takes microseconds, which lets unit tests
/// drive the whole pipeline many times.
#[cfg(test)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Toy;

#[cfg(test)]
impl ParameterSet for Toy {
    const NAME: &'static str = "HuFu-toy";
    const M: usize = 24;
    const N: usize = 32;
    const GADGET_BASE: u32 = 1 << 8;
    const MODULUS: u32 = 1 << 12;
    const MODULUS_BITS: u32 = 12;
    const SIGMA: f64 = 195.3;
    const BOUND_SQUARE: u64 = 3_441_025;
    const KEEP_BITS: u32 = 4;
    const FREQUENCIES: &'static [u16] = &TOY_FREQUENCIES;
    const SIG_BYTES: usize = 512;
    const MAX_MESSAGE_BYTES: usize = 64;
}

#[cfg(test)]
const TOY_FREQUENCIES: [u16; 123] = flat_frequencies();

/// Spreads `2^RANS_SCALE_BITS` as evenly as possible over `N` symbols.
#[cfg(test)]
const fn flat_frequencies<const N: usize>() -> [u16; N] {
    let total = 1_usize << RANS_SCALE_BITS;
    let mut out = [0_u16; N];
    let mut i = 0;
    while i < N {
        out[i] = (total / N + if i < total % N { 1 } else { 0 }) as u16;
        i += 1;
    }
    out
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use num::Float;
    use rstest::rstest;

    use super::*;

    fn check_set<P: ParameterSet>() {
        // frequency table is a valid rANS table
        let total: u32 = P::FREQUENCIES.iter().map(|&f| f as u32).sum();
        assert_eq!(total, 1 << RANS_SCALE_BITS, "{}", P::NAME);
        assert!(P::FREQUENCIES.iter().all(|&f| f >= 1), "{}", P::NAME);

        // alphabet covers ten standard deviations
        let trunc = Float::floor(10.0 * P::SIGMA) as usize;
        assert_eq!(P::ALPHABET, (trunc >> P::KEEP_BITS) + 1, "{}", P::NAME);
        assert_eq!(P::KEEP_BITS, Float::floor(Float::log2(P::SIGMA)) as u32 - 3, "{}", P::NAME);

        // s follows from the dimensions
        let (m, n, q) = (P::M as f64, P::N as f64, SMALL_MODULUS as f64);
        let s = Float::sqrt(q * q + 1.0) / q
            * Float::sqrt(0.5_f64)
            * (Float::sqrt(m) + Float::sqrt(n + m))
            * q
            * SMOOTHING
            * 1.05;
        assert!(Float::abs(s - P::SIGMA) <= 0.05, "{}: {s}", P::NAME);

        // the norm bound follows from s and the gadget rounding error
        let p = P::GADGET_BASE as f64;
        let err_sq = (p * p - 1.0) / 12.0;
        let sigma = P::SIGMA;
        let beta = 1.04 * Float::sqrt(m * (err_sq + sigma * sigma) + (m + n) * sigma * sigma);
        let bound = Float::sqrt(P::BOUND_SQUARE as f64);
        assert_eq!(Float::floor(bound), bound, "{}", P::NAME);
        assert!(Float::abs(beta - bound) < 1.0, "{}: {beta} vs {bound}", P::NAME);

        // the modulus is p * q and fits its lanes
        assert_eq!(P::MODULUS, P::GADGET_BASE * SMALL_MODULUS);
        assert_eq!(1_u64 << P::MODULUS_BITS, P::MODULUS as u64);

        // the conditioned covariance used by key generation is well defined
        assert!(P::sigma_prime_sq() > 1.0);

        // a typical payload fits next to the longest message, and lengths fit the u16 header
        assert!(P::payload_budget(P::MAX_MESSAGE_BYTES) > P::RAW_BYTES);
        assert!(P::SIG_BYTES <= u16::MAX as usize);
    }

    #[test]
    fn parameter_sets_are_consistent() {
        check_set::<HuFu1>();
        check_set::<HuFu3>();
        check_set::<HuFu5>();
        check_set::<Toy>();
    }

    #[rstest]
    #[case::hufu1(HuFu1::PK_BYTES, 32 + 736 * 736 * 2)]
    #[case::hufu3(HuFu3::PK_BYTES, 32 + (1024 * 1024 * 17) / 8)]
    #[case::toy(Toy::PK_BYTES, 32 + 24 * 24 * 3 / 2)]
    fn public_key_sizes(#[case] actual: usize, #[case] expected: usize) {
        assert_eq!(actual, expected);
    }

    #[test]
    fn smoothing_constants_agree() {
        use core::f64::consts::{LN_2, PI};

        let r = Float::sqrt(50.0 * LN_2) / (PI * Float::sqrt(2.0_f64));
        assert!(Float::abs(r - SMOOTHING) < 1e-15);
        assert!(Float::abs(1.0 / (2.0 * r * r) - INV_2_SMOOTHING_SQ) < 1e-15);
    }
}
