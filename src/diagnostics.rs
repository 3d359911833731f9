//! Goodness-of-fit measures for a distribution against an observed sample.

use crate::distributions::Distribution;
use crate::error::DistError;
use crate::preprocessing::validate_sample;

/// Log-likelihood, information criteria and the Kolmogorov-Smirnov distance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoodnessOfFit {
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub ks_statistic: f64,
    pub n_obs: usize,
    pub n_params: usize,
}

/// AIC = 2k - 2 ln L.
pub fn aic(log_likelihood: f64, n_params: usize) -> f64 {
    2.0 * n_params as f64 - 2.0 * log_likelihood
}

/// BIC = k ln n - 2 ln L.
pub fn bic(log_likelihood: f64, n_params: usize, n_obs: usize) -> f64 {
    n_params as f64 * (n_obs as f64).ln() - 2.0 * log_likelihood
}

/// One-sample Kolmogorov-Smirnov statistic sup |F_n(x) - F(x)|.
pub fn ks_statistic(dist: &Distribution, data: &[f64]) -> Result<f64, DistError> {
    validate_sample(data)?;
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mut d: f64 = 0.0;
    for (i, &x) in sorted.iter().enumerate() {
        let f = dist.cdf(x)?;
        let below = f - i as f64 / n;
        let above = (i + 1) as f64 / n - f;
        d = d.max(below).max(above);
    }
    Ok(d)
}

/// Evaluates `dist` against `data`, counting `n_params` estimated parameters.
pub fn goodness_of_fit(
    dist: &Distribution,
    data: &[f64],
    n_params: usize,
) -> Result<GoodnessOfFit, DistError> {
    validate_sample(data)?;
    let log_likelihood = dist.log_likelihood(data)?;
    let n_obs = data.len();

    Ok(GoodnessOfFit {
        log_likelihood,
        aic: aic(log_likelihood, n_params),
        bic: bic(log_likelihood, n_params, n_obs),
        ks_statistic: ks_statistic(dist, data)?,
        n_obs,
        n_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{exponential, normal};

    #[test]
    fn test_information_criteria() {
        assert!((aic(-10.0, 2) - 24.0).abs() < 1e-12);
        assert!((bic(-10.0, 2, 100) - (2.0 * 100f64.ln() + 20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_ks_statistic_of_quantile_grid_is_small() {
        let d = normal().unwrap().distribution(&[]).unwrap();
        let n = 1000;
        let data: Vec<f64> = (0..n)
            .map(|i| d.ppf((i as f64 + 0.5) / n as f64).unwrap())
            .collect();
        let ks = ks_statistic(&d, &data).unwrap();
        assert!((ks - 0.5 / n as f64).abs() < 1e-9);
    }

    #[test]
    fn test_goodness_of_fit_prefers_true_family() {
        let norm = normal().unwrap().distribution(&[]).unwrap();
        let data: Vec<f64> = (0..500)
            .map(|i| norm.ppf((i as f64 + 0.5) / 500.0).unwrap())
            .collect();
        let good = goodness_of_fit(&norm, &data, 2).unwrap();

        let shifted = exponential()
            .unwrap()
            .distribution_with(&[], -4.0, 1.0)
            .unwrap();
        let bad = goodness_of_fit(&shifted, &data, 2).unwrap();
        assert!(good.aic < bad.aic);
        assert!(good.ks_statistic < bad.ks_statistic);
        assert_eq!(good.n_obs, 500);
    }
}
