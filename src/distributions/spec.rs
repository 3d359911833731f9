use super::domain::{Domain, ParamDef};
use super::instance::Distribution;
use super::sampling::SamplingStrategy;
use super::table::QuantileMethod;
use crate::error::DistError;
use crate::fitting::{self, FitOptions, FitResult};
use crate::preprocessing::SampleSummary;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// `f(z, shapes)` in standardized coordinates (loc = 0, scale = 1).
pub type ScalarFn = Arc<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>;
/// `E[Z^n]` for the standardized variable.
pub type RawMomentFn = Arc<dyn Fn(u32, &[f64]) -> f64 + Send + Sync>;
pub type StatsFn = Arc<dyn Fn(&[f64]) -> Moments + Send + Sync>;
pub type EntropyFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;
pub type ValidatorFn = Arc<dyn Fn(&[f64]) -> bool + Send + Sync>;
/// Draws one standardized variate.
pub type SamplerFn = Arc<dyn Fn(&[f64], &mut dyn RngCore) -> f64 + Send + Sync>;
/// Starting shape values for fitting, given summary statistics of the data.
pub type FitStartFn = Arc<dyn Fn(&SampleSummary) -> Vec<f64> + Send + Sync>;

/// Mean, variance, skewness and excess kurtosis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

/// Members a family may supply analytically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    Pdf,
    LogPdf,
    Cdf,
    Sf,
    Ppf,
    Isf,
    RawMoment,
    Stats,
    Entropy,
    Validator,
    Sampler,
    FitStart,
}

pub(crate) struct Members {
    pub(crate) pdf: Option<ScalarFn>,
    pub(crate) logpdf: Option<ScalarFn>,
    pub(crate) cdf: Option<ScalarFn>,
    pub(crate) sf: Option<ScalarFn>,
    pub(crate) ppf: Option<ScalarFn>,
    pub(crate) isf: Option<ScalarFn>,
    pub(crate) raw_moment: Option<RawMomentFn>,
    pub(crate) stats: Option<StatsFn>,
    pub(crate) entropy: Option<EntropyFn>,
    pub(crate) validator: Option<ValidatorFn>,
    pub(crate) sampler: Option<SamplerFn>,
    pub(crate) fit_start: Option<FitStartFn>,
}

pub(crate) struct SpecInner {
    pub(crate) name: String,
    pub(crate) params: Vec<ParamDef>,
    pub(crate) support: (f64, f64),
    pub(crate) members: Members,
    pub(crate) default_strategy: SamplingStrategy,
    pub(crate) default_quantile: QuantileMethod,
}

/// Immutable description of a continuous distribution family.
///
/// A spec holds the family's name, its ordered shape parameters with their
/// domains, the support of the standardized variable and whichever analytic
/// members the implementer supplied. Anything missing is derived at call time
/// by [`Distribution`]. Cloning is cheap.
#[derive(Clone)]
pub struct DistributionSpec {
    pub(crate) inner: Arc<SpecInner>,
}

impl DistributionSpec {
    pub fn builder(name: impl Into<String>) -> DistributionSpecBuilder {
        DistributionSpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parameters(&self) -> &[ParamDef] {
        &self.inner.params
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.inner.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn n_shapes(&self) -> usize {
        self.inner.params.len()
    }

    /// Support `(a, b)` of the standardized variable.
    pub fn support(&self) -> (f64, f64) {
        self.inner.support
    }

    pub fn default_strategy(&self) -> SamplingStrategy {
        self.inner.default_strategy
    }

    pub fn default_quantile_method(&self) -> QuantileMethod {
        self.inner.default_quantile
    }

    pub fn supplies(&self, member: Member) -> bool {
        let m = &self.inner.members;
        match member {
            Member::Pdf => m.pdf.is_some(),
            Member::LogPdf => m.logpdf.is_some(),
            Member::Cdf => m.cdf.is_some(),
            Member::Sf => m.sf.is_some(),
            Member::Ppf => m.ppf.is_some(),
            Member::Isf => m.isf.is_some(),
            Member::RawMoment => m.raw_moment.is_some(),
            Member::Stats => m.stats.is_some(),
            Member::Entropy => m.entropy.is_some(),
            Member::Validator => m.validator.is_some(),
            Member::Sampler => m.sampler.is_some(),
            Member::FitStart => m.fit_start.is_some(),
        }
    }

    pub fn supplied(&self) -> Vec<Member> {
        [
            Member::Pdf,
            Member::LogPdf,
            Member::Cdf,
            Member::Sf,
            Member::Ppf,
            Member::Isf,
            Member::RawMoment,
            Member::Stats,
            Member::Entropy,
            Member::Validator,
            Member::Sampler,
            Member::FitStart,
        ]
        .into_iter()
        .filter(|m| self.supplies(*m))
        .collect()
    }

    pub(crate) fn param_index(&self, name: &str) -> Option<usize> {
        self.inner.params.iter().position(|p| p.name == name)
    }

    /// Binds shape values (loc = 0, scale = 1).
    ///
    /// Only the number of shapes is checked here; domain validation happens
    /// lazily on first evaluation.
    pub fn distribution(&self, shapes: &[f64]) -> Result<Distribution, DistError> {
        Distribution::new(self.clone(), shapes)
    }

    /// Binds shape values together with a location/scale transform.
    pub fn distribution_with(
        &self,
        shapes: &[f64],
        loc: f64,
        scale: f64,
    ) -> Result<Distribution, DistError> {
        Ok(Distribution::new(self.clone(), shapes)?.with_loc_scale(loc, scale))
    }

    /// Estimates parameters from an observed sample.
    pub fn fit(&self, data: &[f64], options: &FitOptions) -> Result<FitResult, DistError> {
        fitting::fit(self, data, options)
    }
}

impl fmt::Debug for DistributionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionSpec")
            .field("name", &self.inner.name)
            .field("params", &self.inner.params)
            .field("support", &self.inner.support)
            .field("supplied", &self.supplied())
            .finish()
    }
}

/// Builder for [`DistributionSpec`]; every analytic member is optional.
pub struct DistributionSpecBuilder {
    name: String,
    params: Vec<ParamDef>,
    support: (f64, f64),
    members: Members,
    default_strategy: SamplingStrategy,
    default_quantile: QuantileMethod,
}

impl DistributionSpecBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            support: (f64::NEG_INFINITY, f64::INFINITY),
            members: Members {
                pdf: None,
                logpdf: None,
                cdf: None,
                sf: None,
                ppf: None,
                isf: None,
                raw_moment: None,
                stats: None,
                entropy: None,
                validator: None,
                sampler: None,
                fit_start: None,
            },
            default_strategy: SamplingStrategy::Auto,
            default_quantile: QuantileMethod::RootFinding,
        }
    }

    pub fn param(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            domain,
        });
        self
    }

    pub fn support(mut self, lower: f64, upper: f64) -> Self {
        self.support = (lower, upper);
        self
    }

    pub fn pdf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.pdf = Some(Arc::new(f));
        self
    }

    pub fn logpdf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.logpdf = Some(Arc::new(f));
        self
    }

    pub fn cdf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.cdf = Some(Arc::new(f));
        self
    }

    pub fn sf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.sf = Some(Arc::new(f));
        self
    }

    pub fn ppf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.ppf = Some(Arc::new(f));
        self
    }

    pub fn isf(mut self, f: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.isf = Some(Arc::new(f));
        self
    }

    pub fn raw_moment(mut self, f: impl Fn(u32, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.raw_moment = Some(Arc::new(f));
        self
    }

    pub fn stats(mut self, f: impl Fn(&[f64]) -> Moments + Send + Sync + 'static) -> Self {
        self.members.stats = Some(Arc::new(f));
        self
    }

    pub fn entropy(mut self, f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        self.members.entropy = Some(Arc::new(f));
        self
    }

    pub fn validator(mut self, f: impl Fn(&[f64]) -> bool + Send + Sync + 'static) -> Self {
        self.members.validator = Some(Arc::new(f));
        self
    }

    pub fn sampler(
        mut self,
        f: impl Fn(&[f64], &mut dyn RngCore) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.members.sampler = Some(Arc::new(f));
        self
    }

    pub fn fit_start(
        mut self,
        f: impl Fn(&SampleSummary) -> Vec<f64> + Send + Sync + 'static,
    ) -> Self {
        self.members.fit_start = Some(Arc::new(f));
        self
    }

    pub fn default_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn default_quantile_method(mut self, method: QuantileMethod) -> Self {
        self.default_quantile = method;
        self
    }

    pub fn build(self) -> Result<DistributionSpec, DistError> {
        if self.name.trim().is_empty() {
            return Err(DistError::InvalidInput(
                "distribution name must not be empty".into(),
            ));
        }

        let (lower, upper) = self.support;
        if lower.is_nan() || upper.is_nan() || lower >= upper {
            return Err(DistError::InvalidInput(format!(
                "support of {} must satisfy lower < upper, got ({lower}, {upper})",
                self.name
            )));
        }

        for (i, param) in self.params.iter().enumerate() {
            if param.name == "loc" || param.name == "scale" {
                return Err(DistError::InvalidInput(format!(
                    "'{}' is reserved for the location/scale transform",
                    param.name
                )));
            }
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(DistError::InvalidInput(format!(
                    "duplicate parameter '{}' in {}",
                    param.name, self.name
                )));
            }
        }

        Ok(DistributionSpec {
            inner: Arc::new(SpecInner {
                name: self.name,
                params: self.params,
                support: self.support,
                members: self.members,
                default_strategy: self.default_strategy,
                default_quantile: self.default_quantile,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_supplied_members() {
        let spec = DistributionSpec::builder("uniform01")
            .support(0.0, 1.0)
            .pdf(|_, _| 1.0)
            .cdf(|z, _| z)
            .build()
            .unwrap();

        assert_eq!(spec.name(), "uniform01");
        assert_eq!(spec.support(), (0.0, 1.0));
        assert_eq!(spec.supplied(), vec![Member::Pdf, Member::Cdf]);
        assert!(!spec.supplies(Member::Ppf));
    }

    #[test]
    fn test_builder_rejects_reserved_and_duplicate_names() {
        let reserved = DistributionSpec::builder("bad")
            .param("scale", Domain::Positive)
            .build();
        assert!(matches!(reserved, Err(DistError::InvalidInput(_))));

        let duplicate = DistributionSpec::builder("bad")
            .param("a", Domain::Real)
            .param("a", Domain::Positive)
            .build();
        assert!(matches!(duplicate, Err(DistError::InvalidInput(_))));
    }

    #[test]
    fn test_builder_rejects_empty_support() {
        let res = DistributionSpec::builder("bad").support(1.0, 1.0).build();
        assert!(matches!(res, Err(DistError::InvalidInput(_))));
    }

    #[test]
    fn test_partial_spec_is_legal() {
        // A sampler-only family builds fine; unsupported operations fail later.
        let spec = DistributionSpec::builder("sampler_only")
            .sampler(|_, _| 0.0)
            .build()
            .unwrap();
        assert!(spec.distribution(&[]).is_ok());
    }

    #[test]
    fn test_distribution_checks_arity() {
        let spec = DistributionSpec::builder("one_shape")
            .param("k", Domain::Positive)
            .pdf(|_, _| 0.0)
            .build()
            .unwrap();
        assert!(matches!(
            spec.distribution(&[1.0, 2.0]),
            Err(DistError::InvalidInput(_))
        ));
        assert_eq!(spec.param_index("k"), Some(0));
        assert_eq!(spec.param_index("nope"), None);
    }
}
