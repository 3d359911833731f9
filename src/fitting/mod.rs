mod solver;

use self::solver::{run_nelder_mead, FitCost, FreeParam, Layout, Slot};
use crate::distributions::{Distribution, DistributionSpec, Domain, Transform};
use crate::error::DistError;
use crate::numeric::NumericConfig;
use crate::preprocessing::{summarize, SampleSummary};
use std::collections::HashMap;
use std::sync::OnceLock;

const DEFAULT_MAX_ITER: usize = 500;
const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Objective minimized by [`fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitMethod {
    /// Mean negative log-likelihood.
    #[default]
    MaximumLikelihood,
    /// Squared standardized gaps between sample and model moments. As many
    /// moments as free parameters are matched, at least two and at most four.
    MethodOfMoments,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitOptions {
    pub method: FitMethod,
    /// Parameters held at a given value. Keys are shape names, `"loc"` or `"scale"`.
    pub fixed: HashMap<String, f64>,
    pub max_iterations: usize,
    /// Nelder-Mead stops once the standard deviation of the simplex costs
    /// falls below this.
    pub tolerance: f64,
    /// When false, an unconverged fit returns its best estimate with
    /// `converged == false` instead of failing.
    pub require_convergence: bool,
    /// Tolerances for the numerical fallbacks of every candidate distribution.
    pub numeric: NumericConfig,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            method: FitMethod::MaximumLikelihood,
            fixed: HashMap::new(),
            max_iterations: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            require_convergence: true,
            numeric: NumericConfig::default(),
        }
    }
}

impl FitOptions {
    pub fn with_method(mut self, method: FitMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_fixed(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fixed.insert(name.into(), value);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_require_convergence(mut self, require: bool) -> Self {
        self.require_convergence = require;
        self
    }

    pub fn with_numeric_config(mut self, numeric: NumericConfig) -> Self {
        self.numeric = numeric;
        self
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitResult {
    /// Name of the fitted family.
    pub distribution: String,
    pub method: FitMethod,
    pub shapes: Vec<f64>,
    pub loc: f64,
    pub scale: f64,
    /// Every parameter by name, including `loc` and `scale`.
    pub params: HashMap<String, f64>,
    /// Final objective value (mean NLL for maximum likelihood).
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl FitResult {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Binds the estimates to `spec`, which must be the family that was fitted.
    pub fn into_distribution(&self, spec: &DistributionSpec) -> Result<Distribution, DistError> {
        if spec.name() != self.distribution {
            return Err(DistError::InvalidInput(format!(
                "fit result belongs to {}, not {}",
                self.distribution,
                spec.name()
            )));
        }
        spec.distribution_with(&self.shapes, self.loc, self.scale)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, DistError> {
        serde_json::to_string(self).map_err(|e| DistError::InvalidInput(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, DistError> {
        serde_json::from_str(json).map_err(|e| DistError::InvalidInput(e.to_string()))
    }
}

fn named_params(spec: &DistributionSpec, shapes: &[f64], loc: f64, scale: f64) -> HashMap<String, f64> {
    let mut params: HashMap<String, f64> = spec
        .param_names()
        .into_iter()
        .map(String::from)
        .zip(shapes.iter().copied())
        .collect();
    params.insert("loc".to_string(), loc);
    params.insert("scale".to_string(), scale);
    params
}

fn check_fixed(spec: &DistributionSpec, name: &str, value: f64) -> Result<Slot, DistError> {
    let invalid = |reason: String| DistError::InvalidParameter {
        distribution: spec.name().to_string(),
        param: name.to_string(),
        reason,
    };
    match name {
        "loc" if value.is_finite() => Ok(Slot::Loc),
        "loc" => Err(invalid(format!("must be finite, got {value}"))),
        "scale" if value.is_finite() && value > 0.0 => Ok(Slot::Scale),
        "scale" => Err(invalid(format!("must be finite and > 0, got {value}"))),
        _ => {
            let i = spec
                .param_index(name)
                .ok_or_else(|| DistError::UnknownParameter {
                    distribution: spec.name().to_string(),
                    param: name.to_string(),
                })?;
            let domain = spec.parameters()[i].domain;
            if domain.contains(value) {
                Ok(Slot::Shape(i))
            } else {
                Err(invalid(format!("must be {domain}, got {value}")))
            }
        }
    }
}

/// Places loc/scale so the whole sample falls inside the support.
fn start_loc_scale(spec: &DistributionSpec, summary: &SampleSummary) -> (f64, f64) {
    let (a, b) = spec.support();
    let sd = summary.std_dev.max(f64::EPSILON);
    let range = (summary.max - summary.min).max(sd);
    match (a.is_finite(), b.is_finite()) {
        (false, false) => (summary.mean, sd),
        (true, false) => (summary.min - a * sd - 1e-3 * sd, sd),
        (false, true) => (summary.max - b * sd + 1e-3 * sd, sd),
        (true, true) => {
            let scale = 1.002 * range / (b - a);
            (summary.min - a * scale - 1e-3 * range, scale)
        }
    }
}

/// Estimates the parameters of `spec` from `data`.
///
/// Free parameters are optimized with Nelder-Mead over free coordinates, so every
/// proposal respects its domain. Start values come from the family's
/// `fit_start` member when supplied (with loc = 0, scale = 1), otherwise from
/// domain defaults with loc/scale placed over the sample.
pub fn fit(
    spec: &DistributionSpec,
    data: &[f64],
    options: &FitOptions,
) -> Result<FitResult, DistError> {
    let summary = summarize(data)?;

    let mut fixed_slots = Vec::with_capacity(options.fixed.len());
    for (name, &value) in &options.fixed {
        fixed_slots.push((check_fixed(spec, name, value)?, value));
    }

    let (mut shapes, mut loc, mut scale) = match &spec.inner.members.fit_start {
        Some(start) => {
            let shapes = start(&summary);
            if shapes.len() != spec.n_shapes() {
                return Err(DistError::InvalidInput(format!(
                    "fit start for {} returned {} values, expected {}",
                    spec.name(),
                    shapes.len(),
                    spec.n_shapes()
                )));
            }
            (shapes, 0.0, 1.0)
        }
        None => {
            let shapes = spec
                .parameters()
                .iter()
                .map(|p| p.domain.typical_value())
                .collect();
            let (loc, scale) = start_loc_scale(spec, &summary);
            (shapes, loc, scale)
        }
    };

    for &(slot, value) in &fixed_slots {
        match slot {
            Slot::Shape(i) => shapes[i] = value,
            Slot::Loc => loc = value,
            Slot::Scale => scale = value,
        }
    }
    let is_fixed = |slot: Slot| fixed_slots.iter().any(|&(s, _)| s == slot);

    let mut free = Vec::new();
    let mut steps = Vec::new();
    for (i, def) in spec.parameters().iter().enumerate() {
        if is_fixed(Slot::Shape(i)) {
            continue;
        }
        // Keep starts strictly inside the domain so the transform is finite.
        if !def.domain.contains(shapes[i]) {
            shapes[i] = def.domain.typical_value();
        }
        let step = match def.domain {
            Domain::Real => 0.25 * shapes[i].abs().max(1.0),
            _ => 0.25,
        };
        free.push(FreeParam {
            slot: Slot::Shape(i),
            transform: def.domain.transform(),
        });
        steps.push(step);
    }
    if !is_fixed(Slot::Loc) {
        free.push(FreeParam {
            slot: Slot::Loc,
            transform: Transform::Identity,
        });
        steps.push(0.25 * summary.std_dev.max(f64::EPSILON));
    }
    if !is_fixed(Slot::Scale) {
        free.push(FreeParam {
            slot: Slot::Scale,
            transform: Transform::Exp,
        });
        steps.push(0.25);
    }

    let layout = Layout {
        spec,
        shapes,
        loc,
        scale,
        free,
        numeric: options.numeric,
    };
    let first_error = OnceLock::new();
    let cost = FitCost {
        layout: &layout,
        data,
        summary: &summary,
        method: options.method,
        first_error: &first_error,
    };

    // Failures that do not depend on where the search is (a family without a
    // density, say) surface here rather than as an infinite objective.
    let x0 = layout.to_free_space();
    let start = match cost.objective(&layout.distribution(&x0)?) {
        Err(DistError::InvalidParameter { .. }) if !layout.free.is_empty() => f64::INFINITY,
        start => start?,
    };

    if layout.free.is_empty() {
        return Ok(FitResult {
            distribution: spec.name().to_string(),
            method: options.method,
            params: named_params(spec, &layout.shapes, layout.loc, layout.scale),
            shapes: layout.shapes.clone(),
            loc: layout.loc,
            scale: layout.scale,
            objective: start,
            iterations: 0,
            converged: true,
        });
    }

    let outcome = match run_nelder_mead(cost, x0, &steps, options.max_iterations, options.tolerance)
    {
        Ok(outcome) if outcome.cost.is_finite() => outcome,
        failed => {
            if let Some(e) = first_error.into_inner() {
                return Err(e);
            }
            return Err(match failed {
                Err(e) => e,
                Ok(_) => DistError::Optimization(format!(
                    "objective for {} is not finite at any visited point",
                    spec.name()
                )),
            });
        }
    };
    if let Some(e) = first_error.get() {
        tracing::debug!(
            distribution = spec.name(),
            error = %e,
            "some proposals failed to evaluate and were skipped"
        );
    }

    let (shapes, loc, scale) = layout.unpack(&outcome.best);
    let params = named_params(spec, &shapes, loc, scale);

    if !outcome.converged {
        tracing::warn!(
            distribution = spec.name(),
            iterations = outcome.iterations,
            objective = outcome.cost,
            "fit did not converge"
        );
        if options.require_convergence {
            return Err(DistError::FitConvergence {
                iterations: outcome.iterations,
                best: params,
            });
        }
    }

    tracing::debug!(
        distribution = spec.name(),
        method = ?options.method,
        iterations = outcome.iterations,
        objective = outcome.cost,
        "fit complete"
    );

    Ok(FitResult {
        distribution: spec.name().to_string(),
        method: options.method,
        shapes,
        loc,
        scale,
        params,
        objective: outcome.cost,
        iterations: outcome.iterations,
        converged: outcome.converged,
    })
}
