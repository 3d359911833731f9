use super::spec::{DistributionSpec, Member, Moments};
use super::table::{QuantileMethod, QuantilePolicy, QuantileTable};
use super::sampling::SamplingStrategy;
use crate::error::DistError;
use crate::math::{binomial, try_map_batch};
use crate::numeric::{self, NumericConfig};
use ndarray::Array1;
use std::sync::OnceLock;

/// A [`DistributionSpec`] bound to shape values and a location/scale transform.
///
/// `X = loc + scale * Z`, where `Z` follows the standardized family of the [`DistributionSpec`].
/// Every operation validates the parameters first (once, then cached) and
/// then either calls the supplied analytic member or derives the result
/// numerically from whatever the family does supply.
#[derive(Debug, Clone)]
pub struct Distribution {
    spec: DistributionSpec,
    shapes: Vec<f64>,
    loc: f64,
    scale: f64,
    numeric: NumericConfig,
    quantile: QuantilePolicy,
    strategy: SamplingStrategy,
    valid: OnceLock<bool>,
    hint: OnceLock<(f64, f64)>,
    table: OnceLock<Result<QuantileTable, DistError>>,
}

impl Distribution {
    pub fn new(spec: DistributionSpec, shapes: &[f64]) -> Result<Self, DistError> {
        if shapes.len() != spec.n_shapes() {
            return Err(DistError::InvalidInput(format!(
                "{} expects {} shape parameter(s) {:?}, got {}",
                spec.name(),
                spec.n_shapes(),
                spec.param_names(),
                shapes.len()
            )));
        }

        let quantile = QuantilePolicy::default().with_method(spec.default_quantile_method());
        let strategy = spec.default_strategy();

        Ok(Self {
            spec,
            shapes: shapes.to_vec(),
            loc: 0.0,
            scale: 1.0,
            numeric: NumericConfig::default(),
            quantile,
            strategy,
            valid: OnceLock::new(),
            hint: OnceLock::new(),
            table: OnceLock::new(),
        })
    }

    // Every wither produces a new instance, so cached state starts empty.
    fn reset(mut self) -> Self {
        self.valid = OnceLock::new();
        self.hint = OnceLock::new();
        self.table = OnceLock::new();
        self
    }

    pub fn with_loc_scale(mut self, loc: f64, scale: f64) -> Self {
        self.loc = loc;
        self.scale = scale;
        self.reset()
    }

    pub fn with_numeric_config(mut self, config: NumericConfig) -> Self {
        self.numeric = config;
        self.reset()
    }

    pub fn with_quantile_policy(mut self, policy: QuantilePolicy) -> Self {
        self.quantile = policy;
        self.reset()
    }

    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn spec(&self) -> &DistributionSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn shapes(&self) -> &[f64] {
        &self.shapes
    }

    pub fn loc(&self) -> f64 {
        self.loc
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn numeric_config(&self) -> &NumericConfig {
        &self.numeric
    }

    pub fn quantile_policy(&self) -> &QuantilePolicy {
        &self.quantile
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Looks up a shape parameter, `"loc"` or `"scale"` by name.
    pub fn param(&self, name: &str) -> Option<f64> {
        match name {
            "loc" => Some(self.loc),
            "scale" => Some(self.scale),
            _ => self.spec.param_index(name).map(|i| self.shapes[i]),
        }
    }

    // ----- Validation

    /// Checks every parameter against its domain, reporting the first violation.
    pub fn check_params(&self) -> Result<(), DistError> {
        let invalid = |param: &str, reason: String| DistError::InvalidParameter {
            distribution: self.spec.name().to_string(),
            param: param.to_string(),
            reason,
        };

        for (def, &value) in self.spec.parameters().iter().zip(self.shapes.iter()) {
            if !def.domain.contains(value) {
                return Err(invalid(
                    &def.name,
                    format!("must be {}, got {value}", def.domain),
                ));
            }
        }
        if !self.loc.is_finite() {
            return Err(invalid("loc", format!("must be finite, got {}", self.loc)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid(
                "scale",
                format!("must be finite and > 0, got {}", self.scale),
            ));
        }
        if let Some(validator) = &self.spec.inner.members.validator {
            if !validator(&self.shapes) {
                return Err(invalid(
                    "shapes",
                    format!("rejected by the family validator: {:?}", self.shapes),
                ));
            }
        }
        Ok(())
    }

    /// Domain check, computed on first use and cached for this instance.
    pub fn validate_params(&self) -> bool {
        *self.valid.get_or_init(|| self.check_params().is_ok())
    }

    pub(crate) fn ensure_valid(&self) -> Result<(), DistError> {
        if self.validate_params() {
            Ok(())
        } else {
            self.check_params()
        }
    }

    fn check_x(x: f64) -> Result<(), DistError> {
        if x.is_nan() {
            return Err(DistError::InvalidInput("evaluation point is NaN".into()));
        }
        Ok(())
    }

    fn check_probability(q: f64) -> Result<(), DistError> {
        if !(0.0..=1.0).contains(&q) {
            return Err(DistError::InvalidInput(format!(
                "probability must be in [0, 1], got {q}"
            )));
        }
        Ok(())
    }

    fn standardize(&self, x: f64) -> f64 {
        (x - self.loc) / self.scale
    }

    // ----- Public API (original coordinates)

    pub fn pdf(&self, x: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_x(x)?;
        Ok(self.std_pdf(self.standardize(x))? / self.scale)
    }

    pub fn logpdf(&self, x: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_x(x)?;
        Ok(self.std_logpdf(self.standardize(x))? - self.scale.ln())
    }

    pub fn cdf(&self, x: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_x(x)?;
        self.std_cdf(self.standardize(x))
    }

    pub fn sf(&self, x: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_x(x)?;
        self.std_sf(self.standardize(x))
    }

    pub fn ppf(&self, q: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_probability(q)?;
        Ok(self.loc + self.scale * self.std_ppf(q)?)
    }

    pub fn isf(&self, q: f64) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Self::check_probability(q)?;
        Ok(self.loc + self.scale * self.std_isf(q)?)
    }

    pub fn median(&self) -> Result<f64, DistError> {
        self.ppf(0.5)
    }

    /// Equal-tail interval containing `confidence` of the mass.
    pub fn interval(&self, confidence: f64) -> Result<(f64, f64), DistError> {
        self.ensure_valid()?;
        Self::check_probability(confidence)?;
        let tail = 0.5 * (1.0 - confidence);
        Ok((self.ppf(tail)?, self.isf(tail)?))
    }

    pub fn stats(&self) -> Result<Moments, DistError> {
        self.ensure_valid()?;
        let m = self.std_stats()?;
        Ok(Moments {
            mean: self.loc + self.scale * m.mean,
            variance: self.scale * self.scale * m.variance,
            skewness: m.skewness,
            excess_kurtosis: m.excess_kurtosis,
        })
    }

    pub fn mean(&self) -> Result<f64, DistError> {
        Ok(self.stats()?.mean)
    }

    pub fn variance(&self) -> Result<f64, DistError> {
        Ok(self.stats()?.variance)
    }

    pub fn std_dev(&self) -> Result<f64, DistError> {
        Ok(self.variance()?.sqrt())
    }

    /// E\[X^n\], expanded binomially through the location/scale transform.
    pub fn raw_moment(&self, n: u32) -> Result<f64, DistError> {
        self.ensure_valid()?;
        (0..=n).try_fold(0.0, |acc, k| -> Result<f64, DistError> {
            let term = binomial(n, k)
                * self.loc.powi((n - k) as i32)
                * self.scale.powi(k as i32)
                * self.std_raw_moment(k)?;
            Ok(acc + term)
        })
    }

    /// Differential entropy in nats.
    pub fn entropy(&self) -> Result<f64, DistError> {
        self.ensure_valid()?;
        Ok(self.std_entropy()? + self.scale.ln())
    }

    pub fn log_likelihood(&self, data: &[f64]) -> Result<f64, DistError> {
        self.ensure_valid()?;
        data.iter()
            .try_fold(0.0, |acc, &x| -> Result<f64, DistError> {
                Ok(acc + self.logpdf(x)?)
            })
    }

    pub fn pdf_batch(&self, x: &Array1<f64>) -> Result<Array1<f64>, DistError> {
        self.ensure_valid()?;
        try_map_batch(x, |v| self.pdf(v))
    }

    pub fn logpdf_batch(&self, x: &Array1<f64>) -> Result<Array1<f64>, DistError> {
        self.ensure_valid()?;
        try_map_batch(x, |v| self.logpdf(v))
    }

    pub fn cdf_batch(&self, x: &Array1<f64>) -> Result<Array1<f64>, DistError> {
        self.ensure_valid()?;
        try_map_batch(x, |v| self.cdf(v))
    }

    /// The interpolation table for this instance, built on first use.
    pub fn quantile_table(&self) -> Result<&QuantileTable, DistError> {
        self.ensure_valid()?;
        self.table()
    }

    // ----- Dispatch (standardized coordinates)

    fn unsupported(&self, operation: &'static str) -> DistError {
        DistError::UnsupportedOperation {
            distribution: self.spec.name().to_string(),
            operation,
        }
    }

    fn has(&self, member: Member) -> bool {
        self.spec.supplies(member)
    }

    fn has_density(&self) -> bool {
        self.has(Member::Pdf) || self.has(Member::LogPdf)
    }

    fn has_cumulative(&self) -> bool {
        self.has(Member::Cdf) || self.has(Member::Sf)
    }

    fn has_quantile(&self) -> bool {
        self.has(Member::Ppf) || self.has(Member::Isf)
    }

    pub(crate) fn table(&self) -> Result<&QuantileTable, DistError> {
        match self.table.get_or_init(|| QuantileTable::build(self)) {
            Ok(table) => Ok(table),
            Err(e) => Err(e.clone()),
        }
    }

    pub(crate) fn std_pdf(&self, z: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if z < a || z > b || z.is_infinite() {
            return Ok(0.0);
        }
        let members = &self.spec.inner.members;
        if let Some(pdf) = &members.pdf {
            return Ok(pdf(z, &self.shapes));
        }
        if let Some(logpdf) = &members.logpdf {
            return Ok(logpdf(z, &self.shapes).exp());
        }
        if self.has_cumulative() || self.has_quantile() {
            tracing::trace!(distribution = self.name(), z, "pdf by differentiating cdf");
            // Keep the difference stencil inside the support; on an end point
            // differentiate from the inside only.
            let mut config = self.numeric;
            let limit_step = |config: &mut NumericConfig, room: f64| {
                if room.is_finite() && room > 0.0 {
                    config.derivative_step =
                        config.derivative_step.min(0.5 * room / z.abs().max(1.0));
                }
            };
            let cdf = |t: f64| self.std_cdf(t);
            let d = if z == a {
                limit_step(&mut config, b - a);
                numeric::derivative_one_sided(cdf, z, 1.0, &config)?
            } else if z == b {
                limit_step(&mut config, b - a);
                numeric::derivative_one_sided(cdf, z, -1.0, &config)?
            } else {
                limit_step(&mut config, (z - a).min(b - z));
                numeric::derivative(cdf, z, &config)?
            };
            return Ok(d.max(0.0));
        }
        Err(self.unsupported("pdf"))
    }

    pub(crate) fn std_logpdf(&self, z: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if z < a || z > b || z.is_infinite() {
            return Ok(f64::NEG_INFINITY);
        }
        if let Some(logpdf) = &self.spec.inner.members.logpdf {
            return Ok(logpdf(z, &self.shapes));
        }
        Ok(self.std_pdf(z)?.ln())
    }

    pub(crate) fn std_cdf(&self, z: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if z <= a {
            return Ok(0.0);
        }
        if z >= b {
            return Ok(1.0);
        }
        let members = &self.spec.inner.members;
        if let Some(cdf) = &members.cdf {
            return Ok(cdf(z, &self.shapes).clamp(0.0, 1.0));
        }
        if let Some(sf) = &members.sf {
            return Ok((1.0 - sf(z, &self.shapes)).clamp(0.0, 1.0));
        }
        if self.has_density() {
            tracing::trace!(distribution = self.name(), z, "cdf by integrating pdf");
            let (center, _) = self.location_hint();
            let p = if z <= center {
                self.density_mass(a, z)?
            } else {
                1.0 - self.density_mass(z, b)?
            };
            return Ok(p.clamp(0.0, 1.0));
        }
        if self.has_quantile() {
            return self.cdf_from_quantile(z);
        }
        Err(self.unsupported("cdf"))
    }

    pub(crate) fn std_sf(&self, z: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if z <= a {
            return Ok(1.0);
        }
        if z >= b {
            return Ok(0.0);
        }
        let members = &self.spec.inner.members;
        if let Some(sf) = &members.sf {
            return Ok(sf(z, &self.shapes).clamp(0.0, 1.0));
        }
        if let Some(cdf) = &members.cdf {
            return Ok((1.0 - cdf(z, &self.shapes)).clamp(0.0, 1.0));
        }
        if self.has_density() {
            let (center, _) = self.location_hint();
            let p = if z >= center {
                self.density_mass(z, b)?
            } else {
                1.0 - self.density_mass(a, z)?
            };
            return Ok(p.clamp(0.0, 1.0));
        }
        Ok(1.0 - self.std_cdf(z)?)
    }

    pub(crate) fn std_ppf(&self, q: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if q == 0.0 {
            return Ok(a);
        }
        if q == 1.0 {
            return Ok(b);
        }
        let members = &self.spec.inner.members;
        if let Some(ppf) = &members.ppf {
            return Ok(ppf(q, &self.shapes));
        }
        if let Some(isf) = &members.isf {
            return Ok(isf(1.0 - q, &self.shapes));
        }
        if !(self.has_cumulative() || self.has_density()) {
            return Err(self.unsupported("ppf"));
        }
        match self.quantile.method {
            QuantileMethod::RootFinding => {
                let (center, spread) = self.location_hint();
                // Solve in whichever tail keeps q's precision.
                if q <= 0.5 {
                    self.invert(|z| Ok(self.std_cdf(z)? - q), center, spread)
                } else {
                    let upper = 1.0 - q;
                    self.invert(|z| Ok(upper - self.std_sf(z)?), center, spread)
                }
            }
            QuantileMethod::Table => Ok(self.table()?.quantile(q)),
        }
    }

    pub(crate) fn std_isf(&self, q: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        if q == 0.0 {
            return Ok(b);
        }
        if q == 1.0 {
            return Ok(a);
        }
        let members = &self.spec.inner.members;
        if let Some(isf) = &members.isf {
            return Ok(isf(q, &self.shapes));
        }
        if let Some(ppf) = &members.ppf {
            return Ok(ppf(1.0 - q, &self.shapes));
        }
        if !(self.has_cumulative() || self.has_density()) {
            return Err(self.unsupported("isf"));
        }
        match self.quantile.method {
            QuantileMethod::RootFinding => {
                let (center, spread) = self.location_hint();
                if q <= 0.5 {
                    self.invert(|z| Ok(q - self.std_sf(z)?), center, spread)
                } else {
                    let lower = 1.0 - q;
                    self.invert(|z| Ok(self.std_cdf(z)? - lower), center, spread)
                }
            }
            QuantileMethod::Table => Ok(self.table()?.quantile(1.0 - q)),
        }
    }

    // Root of a non-decreasing `g`, bracketed outward from `start`.
    fn invert<G>(&self, mut g: G, start: f64, step: f64) -> Result<f64, DistError>
    where
        G: FnMut(f64) -> Result<f64, DistError>,
    {
        let (lo, hi) =
            numeric::bracket_increasing(&mut g, start, step, self.spec.support(), &self.numeric)?;
        if lo == hi {
            return Ok(lo);
        }
        numeric::find_root(&mut g, lo, hi, &self.numeric)
    }

    fn cdf_from_quantile(&self, z: f64) -> Result<f64, DistError> {
        let lo_q = f64::MIN_POSITIVE;
        let hi_q = 1.0 - f64::EPSILON;
        if self.std_ppf(lo_q)? >= z {
            return Ok(0.0);
        }
        if self.std_ppf(hi_q)? <= z {
            return Ok(1.0);
        }
        numeric::find_root(|q| Ok(self.std_ppf(q)? - z), lo_q, hi_q, &self.numeric)
    }

    fn density_mass(&self, lo: f64, hi: f64) -> Result<f64, DistError> {
        let (center, spread) = self.location_hint();
        numeric::integrate(|t| self.std_pdf(t), lo, hi, center, spread, &self.numeric)
    }

    /// Center and length scale of the standardized variable, used to anchor
    /// root brackets, quadrature substitutions and quantile tables.
    pub(crate) fn location_hint(&self) -> (f64, f64) {
        *self.hint.get_or_init(|| self.compute_hint())
    }

    // Runs inside the `hint` cell's initializer, so nothing below may call
    // `location_hint` (directly or through a density-based fallback).
    fn compute_hint(&self) -> (f64, f64) {
        let (a, b) = self.spec.support();
        let fallback = match (a.is_finite(), b.is_finite()) {
            (true, true) => (0.5 * (a + b), 0.25 * (b - a)),
            (true, false) => (a + 1.0, 1.0),
            (false, true) => (b - 1.0, 1.0),
            (false, false) => (0.0, 1.0),
        };
        let usable = |(c, s): (f64, f64)| c.is_finite() && s.is_finite() && s > 0.0;

        let members = &self.spec.inner.members;
        if let Some(stats) = &members.stats {
            let m = stats(&self.shapes);
            let hint = (m.mean, m.variance.sqrt());
            if usable(hint) {
                return hint;
            }
        }

        // Median and interquartile range are defined even for heavy tails.
        if self.has_quantile() || self.has_cumulative() {
            let quantile = |q: f64| -> Result<f64, DistError> {
                if self.has_quantile() {
                    self.std_ppf(q)
                } else {
                    self.invert(|z| Ok(self.std_cdf(z)? - q), fallback.0, fallback.1)
                }
            };
            if let (Ok(q1), Ok(q2), Ok(q3)) = (quantile(0.25), quantile(0.5), quantile(0.75)) {
                let hint = (q2, (q3 - q1) / 1.349);
                if usable(hint) {
                    return hint;
                }
            }
        }

        if self.has_density() {
            let m1 = self.density_moment(1, fallback.0, fallback.1);
            let m2 = self.density_moment(2, fallback.0, fallback.1);
            if let (Ok(m1), Ok(m2)) = (m1, m2) {
                let hint = (m1, (m2 - m1 * m1).sqrt());
                if usable(hint) {
                    return hint;
                }
            }
        }

        fallback
    }

    fn density_moment(&self, n: u32, center: f64, spread: f64) -> Result<f64, DistError> {
        let (a, b) = self.spec.support();
        numeric::integrate(
            |z| {
                let p = self.std_pdf(z)?;
                Ok(if p == 0.0 { 0.0 } else { z.powi(n as i32) * p })
            },
            a,
            b,
            center,
            spread,
            &self.numeric,
        )
    }

    pub(crate) fn std_raw_moment(&self, n: u32) -> Result<f64, DistError> {
        if n == 0 {
            return Ok(1.0);
        }
        let members = &self.spec.inner.members;
        if let Some(raw) = &members.raw_moment {
            return Ok(raw(n, &self.shapes));
        }
        if let (Some(stats), true) = (&members.stats, n <= 4) {
            return Ok(raw_from_moments(&stats(&self.shapes), n));
        }
        if self.has_density() || self.has_cumulative() || self.has_quantile() {
            tracing::trace!(distribution = self.name(), n, "raw moment by quadrature");
            let (center, spread) = self.location_hint();
            return self.density_moment(n, center, spread);
        }
        Err(self.unsupported("raw_moment"))
    }

    pub(crate) fn std_stats(&self) -> Result<Moments, DistError> {
        if let Some(stats) = &self.spec.inner.members.stats {
            return Ok(stats(&self.shapes));
        }
        let m1 = self.std_raw_moment(1)?;
        let m2 = self.std_raw_moment(2)?;
        let m3 = self.std_raw_moment(3)?;
        let m4 = self.std_raw_moment(4)?;

        let variance = m2 - m1 * m1;
        let mu3 = m3 - 3.0 * m1 * m2 + 2.0 * m1.powi(3);
        let mu4 = m4 - 4.0 * m1 * m3 + 6.0 * m1 * m1 * m2 - 3.0 * m1.powi(4);

        Ok(Moments {
            mean: m1,
            variance,
            skewness: mu3 / variance.powf(1.5),
            excess_kurtosis: mu4 / (variance * variance) - 3.0,
        })
    }

    pub(crate) fn std_entropy(&self) -> Result<f64, DistError> {
        if let Some(entropy) = &self.spec.inner.members.entropy {
            return Ok(entropy(&self.shapes));
        }
        if !(self.has_density() || self.has_cumulative() || self.has_quantile()) {
            return Err(self.unsupported("entropy"));
        }
        let (a, b) = self.spec.support();
        let (center, spread) = self.location_hint();
        numeric::integrate(
            |z| {
                let p = self.std_pdf(z)?;
                Ok(if p > 0.0 { -p * self.std_logpdf(z)? } else { 0.0 })
            },
            a,
            b,
            center,
            spread,
            &self.numeric,
        )
    }
}

/// Raw moment E\[Z^n\] (n <= 4) from mean, variance, skewness and excess kurtosis.
fn raw_from_moments(m: &Moments, n: u32) -> f64 {
    let mu = m.mean;
    let var = m.variance;
    let mu3 = m.skewness * var.powf(1.5);
    let mu4 = (m.excess_kurtosis + 3.0) * var * var;
    match n {
        0 => 1.0,
        1 => mu,
        2 => var + mu * mu,
        3 => mu3 + 3.0 * mu * var + mu.powi(3),
        _ => mu4 + 4.0 * mu * mu3 + 6.0 * mu * mu * var + mu.powi(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Domain;
    use crate::math::{std_normal_cdf, std_normal_pdf};

    fn normal_pdf_only() -> DistributionSpec {
        DistributionSpec::builder("normal_pdf_only")
            .pdf(|z, _| std_normal_pdf(z))
            .build()
            .unwrap()
    }

    fn normal_cdf_only() -> DistributionSpec {
        DistributionSpec::builder("normal_cdf_only")
            .cdf(|z, _| std_normal_cdf(z))
            .build()
            .unwrap()
    }

    #[test]
    fn test_cdf_from_pdf() {
        let d = normal_pdf_only().distribution(&[]).unwrap();
        for x in [-3.0, -0.5, 0.0, 1.2, 4.0] {
            let got = d.cdf(x).unwrap();
            assert!(
                (got - std_normal_cdf(x)).abs() < 1e-9,
                "cdf mismatch at {}: {}",
                x,
                got
            );
        }
    }

    #[test]
    fn test_pdf_from_cdf() {
        let d = normal_cdf_only().distribution(&[]).unwrap();
        for x in [-2.0, 0.0, 0.7] {
            assert!((d.pdf(x).unwrap() - std_normal_pdf(x)).abs() < 1e-8);
        }
    }

    #[test]
    fn test_loc_scale_transform() {
        let d = normal_pdf_only()
            .distribution_with(&[], 3.0, 2.0)
            .unwrap();
        assert!((d.pdf(3.0).unwrap() - std_normal_pdf(0.0) / 2.0).abs() < 1e-12);
        assert!((d.cdf(3.0).unwrap() - 0.5).abs() < 1e-9);
        assert!((d.logpdf(5.0).unwrap() - (std_normal_pdf(1.0) / 2.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_ppf_root_finding_matches_cdf() {
        let d = normal_cdf_only().distribution(&[]).unwrap();
        for q in [1e-6, 0.1, 0.5, 0.9, 1.0 - 1e-6] {
            let x = d.ppf(q).unwrap();
            assert!((d.cdf(x).unwrap() - q).abs() < 1e-9);
        }
        assert_eq!(d.ppf(0.0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(d.ppf(1.0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_isf_is_ppf_of_complement() {
        let d = normal_cdf_only().distribution(&[]).unwrap();
        let a = d.isf(0.05).unwrap();
        let b = d.ppf(0.95).unwrap();
        assert!((a - b).abs() < 1e-8);
    }

    #[test]
    fn test_numeric_stats_of_normal() {
        let d = normal_pdf_only()
            .distribution_with(&[], 1.0, 2.0)
            .unwrap();
        let m = d.stats().unwrap();
        assert!((m.mean - 1.0).abs() < 1e-8);
        assert!((m.variance - 4.0).abs() < 1e-7);
        assert!(m.skewness.abs() < 1e-6);
        assert!(m.excess_kurtosis.abs() < 1e-5);
        assert!((d.raw_moment(2).unwrap() - 5.0).abs() < 1e-7);
    }

    #[test]
    fn test_numeric_entropy_of_normal() {
        let d = normal_pdf_only().distribution(&[]).unwrap();
        let expected = 0.5 * (2.0 * std::f64::consts::PI * std::f64::consts::E).ln();
        assert!((d.entropy().unwrap() - expected).abs() < 1e-8);
    }

    #[test]
    fn test_raw_from_moments_matches_definition() {
        let m = Moments {
            mean: 1.5,
            variance: 2.0,
            skewness: 0.3,
            excess_kurtosis: 0.8,
        };
        assert_eq!(raw_from_moments(&m, 0), 1.0);
        assert!((raw_from_moments(&m, 2) - (2.0 + 2.25)).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params_are_cached_and_reported() {
        let spec = DistributionSpec::builder("positive_shape")
            .param("k", Domain::Positive)
            .pdf(|z, _| std_normal_pdf(z))
            .build()
            .unwrap();
        let d = spec.distribution(&[-1.0]).unwrap();
        assert!(!d.validate_params());
        assert!(matches!(
            d.pdf(0.0),
            Err(DistError::InvalidParameter { ref param, .. }) if param == "k"
        ));
        assert!(matches!(d.cdf(0.0), Err(DistError::InvalidParameter { .. })));
    }

    #[test]
    fn test_invalid_params_win_over_other_checks() {
        let d = normal_pdf_only()
            .distribution_with(&[], 0.0, -1.0)
            .unwrap();
        assert!(matches!(
            d.log_likelihood(&[]),
            Err(DistError::InvalidParameter { .. })
        ));
        assert!(matches!(
            d.interval(1.5),
            Err(DistError::InvalidParameter { .. })
        ));
        assert!(matches!(d.entropy(), Err(DistError::InvalidParameter { .. })));
    }

    #[test]
    fn test_pdf_from_cdf_at_support_ends() {
        let spec = DistributionSpec::builder("exponential_cdf_only")
            .support(0.0, f64::INFINITY)
            .cdf(|z, _| -(-z).exp_m1())
            .build()
            .unwrap();
        let d = spec.distribution(&[]).unwrap();
        assert!((d.pdf(0.0).unwrap() - 1.0).abs() < 1e-6);
        assert!((d.pdf(1e-9).unwrap() - 1.0).abs() < 1e-6);

        let shifted = spec.distribution_with(&[], 2.0, 0.5).unwrap();
        assert!((shifted.pdf(2.0).unwrap() - 2.0).abs() < 1e-5);

        // Triangular on [0, 1] peaking at the upper end: F(z) = z^2.
        let rising = DistributionSpec::builder("rising_cdf_only")
            .support(0.0, 1.0)
            .cdf(|z, _| z * z)
            .build()
            .unwrap()
            .distribution(&[])
            .unwrap();
        assert!((rising.pdf(1.0).unwrap() - 2.0).abs() < 1e-6);
        assert!(rising.pdf(0.0).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_custom_validator() {
        let spec = DistributionSpec::builder("ordered")
            .param("lo", Domain::Real)
            .param("hi", Domain::Real)
            .validator(|p| p[0] < p[1])
            .pdf(|_, _| 1.0)
            .build()
            .unwrap();
        assert!(spec.distribution(&[0.0, 1.0]).unwrap().validate_params());
        assert!(!spec.distribution(&[1.0, 0.0]).unwrap().validate_params());
    }

    #[test]
    fn test_nan_inputs_rejected() {
        let d = normal_pdf_only().distribution(&[]).unwrap();
        assert!(matches!(d.pdf(f64::NAN), Err(DistError::InvalidInput(_))));
        assert!(matches!(d.ppf(1.5), Err(DistError::InvalidInput(_))));
        assert!(matches!(d.ppf(f64::NAN), Err(DistError::InvalidInput(_))));
    }

    #[test]
    fn test_sampler_only_family_is_unsupported_for_density() {
        let spec = DistributionSpec::builder("sampler_only")
            .sampler(|_, _| 0.0)
            .build()
            .unwrap();
        let d = spec.distribution(&[]).unwrap();
        assert!(matches!(
            d.pdf(0.0),
            Err(DistError::UnsupportedOperation { operation: "pdf", .. })
        ));
        assert!(matches!(
            d.ppf(0.5),
            Err(DistError::UnsupportedOperation { operation: "ppf", .. })
        ));
        assert!(matches!(
            d.entropy(),
            Err(DistError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_param_lookup() {
        let spec = DistributionSpec::builder("one")
            .param("k", Domain::Positive)
            .pdf(|_, _| 1.0)
            .build()
            .unwrap();
        let d = spec.distribution_with(&[2.5], -1.0, 3.0).unwrap();
        assert_eq!(d.param("k"), Some(2.5));
        assert_eq!(d.param("loc"), Some(-1.0));
        assert_eq!(d.param("scale"), Some(3.0));
        assert_eq!(d.param("missing"), None);
    }

    #[test]
    fn test_batch_evaluation() {
        let d = normal_pdf_only().distribution(&[]).unwrap();
        let x = Array1::from_vec(vec![-1.0, 0.0, 1.0]);
        let pdf = d.pdf_batch(&x).unwrap();
        for i in 0..x.len() {
            assert!((pdf[i] - std_normal_pdf(x[i])).abs() < 1e-15);
        }
    }
}
