use crate::error::DistError;
use ndarray::Array1;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};

/// Threshold for using parallel computation (below this, sequential is faster).
///
/// Below roughly 10k points the Rayon overhead (work splitting, joins)
/// exceeds the benefit for closed-form densities.
#[cfg(feature = "parallel")]
pub(crate) const PARALLEL_THRESHOLD: usize = 10_000;

/// ln(sqrt(2*pi))
pub(crate) const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

// Below this argument the erfc-based log-CDF loses all precision and the
// asymptotic (Mills ratio) series takes over.
const LOG_NDTR_ASYMPTOTIC: f64 = -20.0;

/// Standard normal density.
#[inline]
pub fn std_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z - LN_SQRT_2PI).exp()
}

/// Standard normal CDF, Phi(z) = erfc(-z / sqrt(2)) / 2.
#[inline]
pub fn std_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal quantile, Phi^-1(p) = -sqrt(2) * erfc^-1(2p).
///
/// Returns -inf / +inf at p = 0 / p = 1.
#[inline]
pub fn std_normal_ppf(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// ln(Phi(z)), accurate in both tails.
///
/// # Algorithm
/// 1. z > 0: ln(1 - Phi(-z)) via `ln_1p` so the result keeps precision near 0.
/// 2. -20 <= z <= 0: ln of the erfc-based CDF.
/// 3. z < -20: asymptotic expansion of the Mills ratio,
///    ln Phi(z) ~ -z^2/2 - ln(-z) - ln(sqrt(2 pi)) + ln(1 - 1/z^2 + 3/z^4 - 15/z^6)
///
/// # Reference
/// Abramowitz, M. and Stegun, I.A. (1964), 26.2.12.
#[inline]
pub fn ln_std_normal_cdf(z: f64) -> f64 {
    if z > 0.0 {
        (-std_normal_cdf(-z)).ln_1p()
    } else if z >= LOG_NDTR_ASYMPTOTIC {
        std_normal_cdf(z).ln()
    } else {
        let inv_z2 = 1.0 / (z * z);
        let series = 1.0 - inv_z2 + 3.0 * inv_z2 * inv_z2 - 15.0 * inv_z2 * inv_z2 * inv_z2;
        -0.5 * z * z - (-z).ln() - LN_SQRT_2PI + series.ln()
    }
}

/// Differential entropy of the standard normal, ln(sqrt(2 pi e)).
#[inline]
pub fn std_normal_entropy() -> f64 {
    0.5 * (2.0 * PI * std::f64::consts::E).ln()
}

/// Batch evaluation of a fallible scalar function over an array.
///
/// # Parallelization
/// When the `parallel` feature is enabled and n >= 10,000 the points are
/// evaluated with Rayon; every point is independent so the result is identical
/// to the sequential path. The first error encountered is returned.
pub(crate) fn try_map_batch<F>(x: &Array1<f64>, f: F) -> Result<Array1<f64>, DistError>
where
    F: Fn(f64) -> Result<f64, DistError> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if x.len() >= PARALLEL_THRESHOLD {
            let values: Vec<f64> = x
                .to_vec()
                .into_par_iter()
                .map(&f)
                .collect::<Result<Vec<f64>, DistError>>()?;
            return Ok(Array1::from_vec(values));
        }
    }
    let values = x
        .iter()
        .map(|&v| f(v))
        .collect::<Result<Vec<f64>, DistError>>()?;
    Ok(Array1::from_vec(values))
}

/// Binomial coefficient C(n, k) as f64 (small n only).
pub(crate) fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}
