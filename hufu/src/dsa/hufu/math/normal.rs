use rand_core::RngCore;

use super::samplerz::{GaussianSampler, base_sampler, ber_exp};
use crate::dsa::hufu::{SMOOTHING, SamplerError, params::INV_2_SMOOTHING_SQ};

/// Number of stream bytes consumed by one trial of [GaussianSampler::sample_normal].
pub const NORMAL_TRIAL_BYTES: usize = 9 + 7 + 8 + 1;

/// `2^-53`, the weight of the lowest bit of the uniform fraction.
const FRACTION_SCALE: f64 = 1.0 / (1_u64 << 53) as f64;

impl GaussianSampler {
    /// Samples a real number from the standard normal distribution.
    ///
    /// A trial combines a half-Gaussian integer `x` of width `r` with a uniform 53-bit fraction
    /// `y`, keeps `x + y` with probability `exp(-(y^2 + 2xy) / (2 r^2))` and attaches a random
    /// sign. Since `+0` and `-0` are the same point, a zero magnitude is kept only half of the
    /// time. The result is `(x + y) / r` with that sign.
    ///
    /// Each trial reads the same number of bytes whatever its outcome, and the trial cap of the
    /// sampler applies here as well.
    pub fn sample_normal<R: RngCore>(&self, rng: &mut R) -> Result<f64, SamplerError> {
        let mut trials = 0_u32;
        loop {
            self.check_budget(trials)?;
            trials += 1;

            let mut u = [0_u8; 9];
            rng.fill_bytes(&mut u);
            let x = base_sampler(&u) as f64;

            let mut fraction = [0_u8; 8];
            rng.fill_bytes(&mut fraction[..7]);
            let y = (u64::from_le_bytes(fraction) >> 3) as f64 * FRACTION_SCALE;

            let word = rng.next_u64();
            let mut sign = [0_u8; 1];
            rng.fill_bytes(&mut sign);

            if !ber_exp((y * y + 2.0 * x * y) * INV_2_SMOOTHING_SQ, word) {
                continue;
            }
            let magnitude = x + y;
            if magnitude == 0.0 && sign[0] & 2 != 0 {
                continue;
            }

            let value = magnitude / SMOOTHING;
            return Ok(if sign[0] & 1 == 1 { -value } else { value });
        }
    }
}

// TESTS
// ================================================================================================
