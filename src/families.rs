//! Built-in families.
//!
//! `normal` and `exponential` supply every member analytically. `emg` is the
//! exponentially modified Gaussian, offered in three variants that share the
//! same analytic density and differ only in how they sample.

use crate::distributions::{
    DistributionSpec, Domain, Moments, QuantileMethod, SamplingStrategy,
};
use crate::error::DistError;
use crate::math::{
    ln_std_normal_cdf, std_normal_cdf, std_normal_entropy, std_normal_pdf, std_normal_ppf,
    LN_SQRT_2PI,
};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

// ----- Normal

/// Standard normal in standardized space; use loc/scale for N(mu, sigma^2).
pub fn normal() -> Result<DistributionSpec, DistError> {
    DistributionSpec::builder("normal")
        .pdf(|z, _| std_normal_pdf(z))
        .logpdf(|z, _| -0.5 * z * z - LN_SQRT_2PI)
        .cdf(|z, _| std_normal_cdf(z))
        .sf(|z, _| std_normal_cdf(-z))
        .ppf(|q, _| std_normal_ppf(q))
        .isf(|q, _| -std_normal_ppf(q))
        .stats(|_| Moments {
            mean: 0.0,
            variance: 1.0,
            skewness: 0.0,
            excess_kurtosis: 0.0,
        })
        .entropy(|_| std_normal_entropy())
        .sampler(|_, rng| rng.sample(StandardNormal))
        .build()
}

// ----- Exponential

/// Unit-rate exponential on [0, inf); scale is 1 / rate.
pub fn exponential() -> Result<DistributionSpec, DistError> {
    DistributionSpec::builder("exponential")
        .support(0.0, f64::INFINITY)
        .pdf(|z, _| (-z).exp())
        .logpdf(|z, _| -z)
        .cdf(|z, _| -(-z).exp_m1())
        .sf(|z, _| (-z).exp())
        .ppf(|q, _| -(-q).ln_1p())
        .isf(|q, _| -q.ln())
        .raw_moment(|n, _| (1..=n).map(f64::from).product())
        .stats(|_| Moments {
            mean: 1.0,
            variance: 1.0,
            skewness: 2.0,
            excess_kurtosis: 6.0,
        })
        .entropy(|_| 1.0)
        .sampler(|_, rng| rng.sample(Exp1))
        .build()
}

// ----- Exponentially modified Gaussian

/// Sampling flavour of the EMG family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmgVariant {
    /// No quantile or sampler supplied: each draw solves `cdf(x) = u`.
    #[default]
    NumericInversion,
    /// Draws are read from an interpolated quantile table built once.
    Interpolated,
    /// Draws are `mu + sigma * N(0, 1) + Exp(1) / lambda`.
    Decomposed,
}

const EMG_MU: usize = 0;
const EMG_SIGMA: usize = 1;
const EMG_LAMBDA: usize = 2;

// Skewness of an EMG lies in (0, 2); clamp the sample value inside it.
const EMG_MIN_SKEW: f64 = 0.01;
const EMG_MAX_SKEW: f64 = 1.99;

/// ln f(z) = ln(lambda) + lambda (mu - z) + (lambda sigma)^2 / 2
///           + ln Phi((z - mu) / sigma - lambda sigma)
fn emg_logpdf(z: f64, p: &[f64]) -> f64 {
    let (mu, sigma, lambda) = (p[EMG_MU], p[EMG_SIGMA], p[EMG_LAMBDA]);
    let ls = lambda * sigma;
    lambda.ln() + lambda * (mu - z) + 0.5 * ls * ls + ln_std_normal_cdf((z - mu) / sigma - ls)
}

fn emg_cdf(z: f64, p: &[f64]) -> f64 {
    let (mu, sigma, lambda) = (p[EMG_MU], p[EMG_SIGMA], p[EMG_LAMBDA]);
    let u = (z - mu) / sigma;
    (std_normal_cdf(u) - (emg_logpdf(z, p) - lambda.ln()).exp()).clamp(0.0, 1.0)
}

fn emg_sf(z: f64, p: &[f64]) -> f64 {
    let (mu, sigma, lambda) = (p[EMG_MU], p[EMG_SIGMA], p[EMG_LAMBDA]);
    let u = (z - mu) / sigma;
    (std_normal_cdf(-u) + (emg_logpdf(z, p) - lambda.ln()).exp()).clamp(0.0, 1.0)
}

fn emg_stats(p: &[f64]) -> Moments {
    let (mu, sigma, lambda) = (p[EMG_MU], p[EMG_SIGMA], p[EMG_LAMBDA]);
    let tau = 1.0 / lambda;
    let variance = sigma * sigma + tau * tau;
    Moments {
        mean: mu + tau,
        variance,
        skewness: 2.0 * tau.powi(3) / variance.powf(1.5),
        excess_kurtosis: 6.0 * tau.powi(4) / (variance * variance),
    }
}

/// Moment-matching start: tau = s (g / 2)^(1/3), sigma^2 = s^2 - tau^2, mu = m - tau.
fn emg_fit_start(summary: &crate::preprocessing::SampleSummary) -> Vec<f64> {
    let s = summary.std_dev.max(f64::EPSILON);
    let g = summary.skewness.clamp(EMG_MIN_SKEW, EMG_MAX_SKEW);
    let tau = s * (0.5 * g).cbrt();
    let sigma = (s * s - tau * tau).max(1e-4 * s * s).sqrt();
    vec![summary.mean - tau, sigma, 1.0 / tau]
}

/// Exponentially modified Gaussian with shapes `mu` (real), `sigma` (> 0)
/// and `lambda` (> 0, the exponential rate).
pub fn emg(variant: EmgVariant) -> Result<DistributionSpec, DistError> {
    let builder = DistributionSpec::builder("emg")
        .param("mu", Domain::Real)
        .param("sigma", Domain::Positive)
        .param("lambda", Domain::Positive)
        .pdf(|z, p| emg_logpdf(z, p).exp())
        .logpdf(emg_logpdf)
        .cdf(emg_cdf)
        .sf(emg_sf)
        .stats(emg_stats)
        .fit_start(emg_fit_start);

    let builder = match variant {
        EmgVariant::NumericInversion => builder
            .default_strategy(SamplingStrategy::Inversion)
            .default_quantile_method(QuantileMethod::RootFinding),
        EmgVariant::Interpolated => builder
            .default_strategy(SamplingStrategy::TableInversion)
            .default_quantile_method(QuantileMethod::Table),
        EmgVariant::Decomposed => builder
            .default_strategy(SamplingStrategy::Native)
            .sampler(|p, rng| {
                let n: f64 = rng.sample(StandardNormal);
                let e: f64 = rng.sample(Exp1);
                p[EMG_MU] + p[EMG_SIGMA] * n + e / p[EMG_LAMBDA]
            }),
    };

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Member;

    #[test]
    fn test_normal_reference_values() {
        let d = normal().unwrap().distribution(&[]).unwrap();
        assert!((d.pdf(0.0).unwrap() - 0.398942).abs() < 1e-6);
        assert!((d.cdf(0.0).unwrap() - 0.5).abs() < 1e-15);
        assert!((d.ppf(0.975).unwrap() - 1.959964).abs() < 1e-6);
        assert!((d.isf(0.025).unwrap() - 1.959964).abs() < 1e-6);
    }

    #[test]
    fn test_exponential_members() {
        let d = exponential().unwrap().distribution_with(&[], 0.0, 2.0).unwrap();
        assert_eq!(d.pdf(-1.0).unwrap(), 0.0);
        assert!((d.cdf(2.0).unwrap() - (1.0 - (-1.0f64).exp())).abs() < 1e-15);
        assert!((d.mean().unwrap() - 2.0).abs() < 1e-15);
        assert!((d.raw_moment(2).unwrap() - 8.0).abs() < 1e-12);
        assert!((d.entropy().unwrap() - (1.0 + 2.0f64.ln())).abs() < 1e-15);
        assert_eq!(d.ppf(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_emg_density_matches_closed_form() {
        // f(x) = (lambda/2) exp((lambda/2)(2 mu + lambda sigma^2 - 2x)) erfc((mu + lambda sigma^2 - x)/(sqrt(2) sigma))
        let (mu, sigma, lambda) = (0.0, 1.0, 0.5);
        let d = emg(EmgVariant::default())
            .unwrap()
            .distribution(&[mu, sigma, lambda])
            .unwrap();
        for x in [-2.0, 0.0, 1.5, 6.0] {
            let arg = (mu + lambda * sigma * sigma - x) / (std::f64::consts::SQRT_2 * sigma);
            let expected = 0.5
                * lambda
                * (0.5 * lambda * (2.0 * mu + lambda * sigma * sigma - 2.0 * x)).exp()
                * statrs::function::erf::erfc(arg);
            assert!((d.pdf(x).unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_emg_cdf_sf_complement() {
        let d = emg(EmgVariant::default())
            .unwrap()
            .distribution(&[1.0, 0.7, 2.0])
            .unwrap();
        for x in [-1.0, 0.5, 1.0, 3.0, 8.0] {
            let total = d.cdf(x).unwrap() + d.sf(x).unwrap();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_emg_logpdf_far_left_tail_is_finite() {
        let d = emg(EmgVariant::default())
            .unwrap()
            .distribution(&[0.0, 1.0, 0.5])
            .unwrap();
        let lp = d.logpdf(-60.0).unwrap();
        assert!(lp.is_finite() && lp < -1000.0);
    }

    #[test]
    fn test_emg_variants_differ_only_in_sampling() {
        let numeric = emg(EmgVariant::NumericInversion).unwrap();
        let table = emg(EmgVariant::Interpolated).unwrap();
        let native = emg(EmgVariant::Decomposed).unwrap();
        assert!(!numeric.supplies(Member::Sampler));
        assert!(native.supplies(Member::Sampler));
        assert_eq!(numeric.default_strategy(), SamplingStrategy::Inversion);
        assert_eq!(table.default_strategy(), SamplingStrategy::TableInversion);
        assert_eq!(native.default_strategy(), SamplingStrategy::Native);
        assert_eq!(table.default_quantile_method(), QuantileMethod::Table);
    }

    #[test]
    fn test_emg_fit_start_inverts_moments() {
        let shapes = [0.5, 1.0, 0.8];
        let m = emg_stats(&shapes);
        let summary = crate::preprocessing::SampleSummary {
            n: 1000,
            mean: m.mean,
            variance: m.variance,
            std_dev: m.variance.sqrt(),
            skewness: m.skewness,
            excess_kurtosis: m.excess_kurtosis,
            min: -3.0,
            max: 10.0,
        };
        let start = emg_fit_start(&summary);
        for (got, want) in start.iter().zip(shapes.iter()) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
    }
}
