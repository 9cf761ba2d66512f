use alloc::vec::Vec;

use num::Float;
use rand_core::RngCore;

use super::{CholeskyTriple, GaussianSampler, TrapdoorMatrix};
use crate::{
    dsa::hufu::{ParameterSet, SMALL_MODULUS, SMOOTHING, SamplerError},
    utils::zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing},
};

/// A perturbation `p = (p0, p1, p2)` with `p0, p2` of length `M` and `p1` of length `N`.
#[derive(Clone, PartialEq, Eq)]
pub struct Perturbation {
    pub p0: Vec<i64>,
    pub p1: Vec<i64>,
    pub p2: Vec<i64>,
}

impl Zeroize for Perturbation {
    fn zeroize(&mut self) {
        self.p0.zeroize();
        self.p1.zeroize();
        self.p2.zeroize();
    }
}

impl Drop for Perturbation {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for Perturbation {}

/// Samples a perturbation whose covariance is `s^2 * I - (q r)^2 * T * T^T` for `T = [E; S; I]`.
///
/// A standard normal vector `y = (y0, y1, y2)` is pushed through the Cholesky factors to get the
/// centers
///
/// - `c2 = q r sqrt(sigma'^2 - 1) * y2`,
/// - `c1 = L22 * y1 + S * w`,
/// - `c0 = L33 * y0 + L32 * y1 + E * w`,
///
/// with `w = -q r / sqrt(sigma'^2 - 1) * y2`, and every coordinate is rounded with the integer
/// Gaussian sampler. The output does not depend on the syndrome being signed.
pub fn sample_preimage<P: ParameterSet, R: RngCore>(
    trapdoor: &TrapdoorMatrix,
    cholesky: &CholeskyTriple,
    sampler: &GaussianSampler,
    rng: &mut R,
) -> Result<Perturbation, SamplerError> {
    let (m, n) = (P::M, P::N);

    let mut y = Zeroizing::new(Vec::with_capacity(n + 2 * m));
    for _ in 0..n + 2 * m {
        y.push(sampler.sample_normal(rng)?);
    }
    let (y0, rest) = y.split_at(m);
    let (y1, y2) = rest.split_at(n);

    let qr = SMALL_MODULUS as f64 * SMOOTHING;
    let root = Float::sqrt(P::sigma_prime_sq() - 1.0);
    let factor2 = qr * root;
    let factor1 = -qr / root;

    let w = Zeroizing::new(y2.iter().map(|y| factor1 * y).collect::<Vec<_>>());

    let c2 = Zeroizing::new(y2.iter().map(|y| factor2 * y).collect::<Vec<_>>());

    let mut c1 = Zeroizing::new(cholesky.l22().mul_vec(y1));
    add_assign(&mut c1, trapdoor.s().mul_vec_f64(&w));

    let mut c0 = Zeroizing::new(cholesky.l33().mul_vec(y0));
    add_assign(&mut c0, cholesky.l32().mul_vec(y1));
    add_assign(&mut c0, trapdoor.e().mul_vec_f64(&w));

    Ok(Perturbation {
        p0: sample_all(&c0, sampler, rng)?,
        p1: sample_all(&c1, sampler, rng)?,
        p2: sample_all(&c2, sampler, rng)?,
    })
}

fn add_assign(target: &mut [f64], mut other: Vec<f64>) {
    for (t, o) in target.iter_mut().zip(&other) {
        *t += o;
    }
    other.zeroize();
}

fn sample_all<R: RngCore>(
    centers: &[f64],
    sampler: &GaussianSampler,
    rng: &mut R,
) -> Result<Vec<i64>, SamplerError> {
    centers.iter().map(|&center| sampler.sample(center, rng)).collect()
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        SEED_BYTES,
        dsa::hufu::{Config, math::generate_trapdoor, params::Toy},
        hash::Domain,
        rand::SeededStream,
    };

    #[test]
    fn perturbation_has_the_conditioned_covariance() {
        let (trapdoor, triple) =
            generate_trapdoor::<Toy>(&[9; SEED_BYTES], &Config::default()).unwrap();
        let sampler = GaussianSampler::default();
        let mut rng = SeededStream::new(&[10; SEED_BYTES], Domain::Preimage);

        let samples: Vec<Perturbation> = (0..600)
            .map(|_| sample_preimage::<Toy, _>(&trapdoor, &triple, &sampler, &mut rng).unwrap())
            .collect();
        for p in &samples {
            assert_eq!((p.p0.len(), p.p1.len(), p.p2.len()), (Toy::M, Toy::N, Toy::M));
        }

        // Column j of T = [E; S; I] as a direction d: Var(d^T p) = s^2 |d|^2 - (q r)^2 |T^T d|^2.
        let (e, s) = (trapdoor.e(), trapdoor.s());
        let column = |j: usize| -> Vec<f64> {
            let mut d: Vec<f64> = (0..Toy::M).map(|i| e.row(i)[j] as f64).collect();
            d.extend((0..Toy::N).map(|i| s.row(i)[j] as f64));
            d.extend((0..Toy::M).map(|i| if i == j { 1.0 } else { 0.0 }));
            d
        };
        let qr_sq = (SMALL_MODULUS as f64 * SMOOTHING) * (SMALL_MODULUS as f64 * SMOOTHING);

        let mut ratio_sum = 0.0;
        for j in 0..Toy::M {
            let d = column(j);
            let norm_sq: f64 = d.iter().map(|x| x * x).sum();
            let t_d_sq: f64 = (0..Toy::M)
                .map(|k| {
                    let col = column(k);
                    let dot: f64 = col.iter().zip(&d).map(|(a, b)| a * b).sum();
                    dot * dot
                })
                .sum();
            let expected = Toy::SIGMA * Toy::SIGMA * norm_sq - qr_sq * t_d_sq;

            let projections: Vec<f64> = samples
                .iter()
                .map(|p| {
                    p.p0.iter()
                        .chain(&p.p1)
                        .chain(&p.p2)
                        .zip(&d)
                        .map(|(&x, &w)| x as f64 * w)
                        .sum()
                })
                .collect();
            let mean = projections.iter().sum::<f64>() / projections.len() as f64;
            let var = projections.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>()
                / (projections.len() as f64 - 1.0);
            ratio_sum += var / expected;
        }
        let ratio = ratio_sum / Toy::M as f64;
        assert!(Float::abs(ratio - 1.0) < 0.1, "{ratio}");
    }

    #[test]
    fn sampler_cap_propagates() {
        let (trapdoor, triple) =
            generate_trapdoor::<Toy>(&[9; SEED_BYTES], &Config::default()).unwrap();
        let sampler = GaussianSampler::new(Some(1));
        let mut rng = SeededStream::new(&[11; SEED_BYTES], Domain::Preimage);
        assert_matches!(
            sample_preimage::<Toy, _>(&trapdoor, &triple, &sampler, &mut rng).err(),
            Some(SamplerError::Exhausted { trials: 1 })
        );
    }
}
