use crate::error::DistError;

/// Summary statistics of an observed sample, used to seed fits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleSummary {
    pub n: usize,
    pub mean: f64,
    /// Unbiased (n - 1) variance.
    pub variance: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub min: f64,
    pub max: f64,
}

/// Rejects samples that cannot be fitted: fewer than two points or any
/// non-finite value.
pub fn validate_sample(data: &[f64]) -> Result<(), DistError> {
    if data.len() < 2 {
        return Err(DistError::InvalidInput(format!(
            "need at least 2 observations, got {}",
            data.len()
        )));
    }
    if let Some((i, v)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(DistError::InvalidInput(format!(
            "observation {i} is not finite ({v})"
        )));
    }
    Ok(())
}

/// Validates and summarizes a sample.
///
/// Skewness and excess kurtosis are the plain moment estimators
/// (m3 / m2^1.5 and m4 / m2^2 - 3, with population central moments), which
/// is what starting-value heuristics expect.
pub fn summarize(data: &[f64]) -> Result<SampleSummary, DistError> {
    validate_sample(data)?;

    let n = data.len();
    let nf = n as f64;
    let mean = data.iter().sum::<f64>() / nf;

    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &x in data {
        let d = x - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
        min = min.min(x);
        max = max.max(x);
    }
    let variance = m2 / (nf - 1.0);
    let (m2, m3, m4) = (m2 / nf, m3 / nf, m4 / nf);

    let (skewness, excess_kurtosis) = if m2 > 0.0 {
        (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    Ok(SampleSummary {
        n,
        mean,
        variance,
        std_dev: variance.sqrt(),
        skewness,
        excess_kurtosis,
        min,
        max,
    })
}
