use core::f64::consts::LN_2;

use num::Float;
use rand_core::RngCore;

use crate::dsa::hufu::{SamplerError, params::INV_2_SMOOTHING_SQ};

/// Number of stream bytes consumed by one trial of [GaussianSampler::sample].
pub const SAMPLERZ_TRIAL_BYTES: usize = 9 + 1 + 8;

/// Reverse cumulative distribution table of the half-Gaussian of width `r` on the non-negative
/// integers, scaled by `2^72`: entry `i` is `floor(2^72 * P(X > i))`.
const RCDT: [u128; 13] = [
    2536800237887016867992,
    892856029595527652994,
    193245440485773366765,
    24795107522567216787,
    1847702918096939891,
    79054653539233742,
    1929583529504278,
    26771580080544,
    210705648542,
    939662865,
    2372904,
    3391,
    2,
];

/// Samples an integer from {0, ..., 13} according to the half-Gaussian distribution with standard
/// deviation `r`, using 72 uniform bits read little-endian from `bytes`.
pub(crate) fn base_sampler(bytes: &[u8; 9]) -> i64 {
    let mut wide = [0_u8; 16];
    wide[..9].copy_from_slice(bytes);
    let u = u128::from_le_bytes(wide);
    RCDT.iter().filter(|&&threshold| u < threshold).count() as i64
}

/// Computes an integer approximation of `2^63 * exp(-x)` for `x` in `[0, ln 2)`.
fn approx_exp(x: f64) -> u64 {
    // FACCT coefficients for exp(-x), scaled by 2^63:
    //   https://eprint.iacr.org/2018/1234
    const C: [u64; 13] = [
        0x00000004741183a3u64,
        0x00000036548cfc06u64,
        0x0000024fdcbf140au64,
        0x0000171d939de045u64,
        0x0000d00cf58f6f84u64,
        0x000680681cf796e3u64,
        0x002d82d8305b0feau64,
        0x011111110e066fd0u64,
        0x0555555555070f00u64,
        0x155555555581ff00u64,
        0x400000000002b400u64,
        0x7fffffffffff4800u64,
        0x8000000000000000u64,
    ];
    const TWO_POW_63: f64 = (1_u64 << 63) as f64;

    let z = Float::floor(x * TWO_POW_63) as u64;
    let mut y = C[0];
    for &c in C.iter().skip(1) {
        let zy = (z as u128) * (y as u128);
        y = c - ((zy >> 63) as u64);
    }
    y
}

/// Returns true with probability close to `exp(-x)`, given a uniform 64-bit `word`.
///
/// The decision always consumes exactly one word regardless of `x`.
pub(crate) fn ber_exp(x: f64, word: u64) -> bool {
    const INV_LN_2: f64 = 1.0 / LN_2;
    let s = Float::floor(x * INV_LN_2);
    let t = x - s * LN_2;
    let shift = (s as u64).min(63);
    // exp(-t) can round to exactly 2^63, in which case the shift wraps to zero
    let threshold = (approx_exp(t) << 1).wrapping_sub(1) >> shift;
    word < threshold
}

// GAUSSIAN SAMPLER
// ================================================================================================

/// Samples the discrete Gaussian of width `r` (see [`SMOOTHING`](crate::dsa::hufu::SMOOTHING))
/// around an arbitrary real center.
///
/// Each trial reads a fixed number of bytes from the stream, independent of the center and of the
/// values drawn. The number of trials is random; an optional cap turns an unlucky streak into
/// [`SamplerError::Exhausted`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaussianSampler {
    max_trials: Option<u32>,
}

impl GaussianSampler {
    /// Returns a sampler which gives up after `max_trials` rejected trials, or never if `None`.
    pub fn new(max_trials: Option<u32>) -> Self {
        Self { max_trials }
    }

    /// Samples an integer from the discrete Gaussian of width `r` centered at `center`.
    pub fn sample<R: RngCore>(&self, center: f64, rng: &mut R) -> Result<i64, SamplerError> {
        let floor = Float::floor(center);
        let frac = center - floor;
        let base = floor as i64;

        let mut trials = 0_u32;
        loop {
            self.check_budget(trials)?;
            trials += 1;

            let mut u = [0_u8; 9];
            rng.fill_bytes(&mut u);
            let z0 = base_sampler(&u);

            let mut sign = [0_u8; 1];
            rng.fill_bytes(&mut sign);
            let b = (sign[0] & 1) as i64;
            let word = rng.next_u64();

            // x = ((z - frac)^2 - z0^2) / (2 r^2), never negative
            let z = b + (2 * b - 1) * z0;
            let shifted = z as f64 - frac;
            let x = (shifted * shifted - (z0 * z0) as f64) * INV_2_SMOOTHING_SQ;

            if ber_exp(x, word) {
                return Ok(z + base);
            }
        }
    }

    /// Fails once `trials` has reached the cap.
    pub(crate) fn check_budget(&self, trials: u32) -> Result<(), SamplerError> {
        match self.max_trials {
            Some(max) if trials >= max => Err(SamplerError::Exhausted { trials }),
            _ => Ok(()),
        }
    }
}

// TESTS
// ================================================================================================
