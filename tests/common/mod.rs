#![allow(dead_code)]

use contdist_rs::{std_normal_cdf, std_normal_pdf, DistributionSpec};
use rand::prelude::*;
use rand_distr::{Distribution, Exp, Normal};

pub struct Generator {
    pub rng: StdRng,
}

impl Generator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// EMG draws built independently of the crate: Normal(mu, sigma) + Exp(lambda).
    pub fn emg_data(&mut self, n: usize, mu: f64, sigma: f64, lambda: f64) -> Vec<f64> {
        let normal = Normal::new(mu, sigma).unwrap();
        let exp = Exp::new(lambda).unwrap();
        (0..n)
            .map(|_| normal.sample(&mut self.rng) + exp.sample(&mut self.rng))
            .collect()
    }

    pub fn normal_data(&mut self, n: usize, mu: f64, sigma: f64) -> Vec<f64> {
        let normal = Normal::new(mu, sigma).unwrap();
        (0..n).map(|_| normal.sample(&mut self.rng)).collect()
    }
}

/// Sample mean and unbiased variance.
pub fn mean_var(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

/// A normal family defined only through its density.
pub fn pdf_only_normal() -> DistributionSpec {
    DistributionSpec::builder("pdf_only_normal")
        .pdf(|z, _| std_normal_pdf(z))
        .build()
        .unwrap()
}

/// A normal family defined only through its cumulative distribution.
pub fn cdf_only_normal() -> DistributionSpec {
    DistributionSpec::builder("cdf_only_normal")
        .cdf(|z, _| std_normal_cdf(z))
        .build()
        .unwrap()
}
