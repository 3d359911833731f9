use super::FitMethod;
use crate::distributions::{Distribution, DistributionSpec, Transform};
use crate::error::DistError;
use crate::numeric::NumericConfig;
use crate::preprocessing::SampleSummary;
use crate::types::ParamVector;
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use std::sync::OnceLock;

/// Where a free parameter lands in the bound distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Shape(usize),
    Loc,
    Scale,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FreeParam {
    pub(crate) slot: Slot,
    pub(crate) transform: Transform,
}

/// Full parameter state of a fit: fixed values are baked in, free ones are
/// overwritten from the optimizer's free-coordinate vector.
#[derive(Debug)]
pub(crate) struct Layout<'a> {
    pub(crate) spec: &'a DistributionSpec,
    pub(crate) shapes: Vec<f64>,
    pub(crate) loc: f64,
    pub(crate) scale: f64,
    pub(crate) free: Vec<FreeParam>,
    pub(crate) numeric: NumericConfig,
}

impl Layout<'_> {
    pub(crate) fn to_free_space(&self) -> ParamVector {
        let values = self
            .free
            .iter()
            .map(|p| p.transform.to_free(self.value(p.slot)))
            .collect();
        ParamVector::from_vec(values)
    }

    fn value(&self, slot: Slot) -> f64 {
        match slot {
            Slot::Shape(i) => self.shapes[i],
            Slot::Loc => self.loc,
            Slot::Scale => self.scale,
        }
    }

    /// Natural-scale `(shapes, loc, scale)` for a free-coordinate vector.
    pub(crate) fn unpack(&self, eta: &ParamVector) -> (Vec<f64>, f64, f64) {
        let mut shapes = self.shapes.clone();
        let (mut loc, mut scale) = (self.loc, self.scale);
        for (p, &e) in self.free.iter().zip(eta.iter()) {
            let v = p.transform.to_domain(e);
            match p.slot {
                Slot::Shape(i) => shapes[i] = v,
                Slot::Loc => loc = v,
                Slot::Scale => scale = v,
            }
        }
        (shapes, loc, scale)
    }

    pub(crate) fn distribution(&self, eta: &ParamVector) -> Result<Distribution, DistError> {
        let (shapes, loc, scale) = self.unpack(eta);
        Ok(self
            .spec
            .distribution_with(&shapes, loc, scale)?
            .with_numeric_config(self.numeric))
    }
}

pub(crate) struct FitCost<'a> {
    pub(crate) layout: &'a Layout<'a>,
    pub(crate) data: &'a [f64],
    pub(crate) summary: &'a SampleSummary,
    pub(crate) method: FitMethod,
    /// First evaluation error seen by the optimizer, kept for reporting.
    pub(crate) first_error: &'a OnceLock<DistError>,
}

impl FitCost<'_> {
    pub(crate) fn objective(&self, dist: &Distribution) -> Result<f64, DistError> {
        match self.method {
            FitMethod::MaximumLikelihood => {
                Ok(-dist.log_likelihood(self.data)? / self.data.len() as f64)
            }
            FitMethod::MethodOfMoments => {
                let m = dist.stats()?;
                let s = self.summary;
                let residuals = [
                    (m.mean - s.mean) / s.std_dev,
                    (m.variance - s.variance) / s.variance,
                    m.skewness - s.skewness,
                    m.excess_kurtosis - s.excess_kurtosis,
                ];
                let k = self.layout.free.len().clamp(2, 4);
                Ok(residuals[..k].iter().map(|r| r * r).sum())
            }
        }
    }
}

impl CostFunction for FitCost<'_> {
    type Param = ParamVector;
    type Output = f64;

    // Never returns `Err`: Nelder-Mead unwraps the costs of its initial
    // simplex, so failures become +inf and the first one is recorded.
    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let value = self
            .layout
            .distribution(param)
            .and_then(|dist| self.objective(&dist));
        match value {
            // Nelder-Mead orders vertices by cost and cannot handle NaN.
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) | Err(DistError::InvalidParameter { .. }) => Ok(f64::INFINITY),
            Err(e) => {
                let _ = self.first_error.set(e);
                Ok(f64::INFINITY)
            }
        }
    }
}

pub(crate) struct SolverOutcome {
    pub(crate) best: ParamVector,
    pub(crate) cost: f64,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

/// Axis-aligned starting simplex around `x0`.
fn initial_simplex(x0: &ParamVector, steps: &[f64]) -> Vec<ParamVector> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.clone());
    for (i, &step) in steps.iter().enumerate() {
        let mut vertex = x0.clone();
        vertex[i] += step;
        simplex.push(vertex);
    }
    simplex
}

pub(crate) fn run_nelder_mead(
    cost: FitCost<'_>,
    x0: ParamVector,
    steps: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> Result<SolverOutcome, DistError> {
    let solver = NelderMead::new(initial_simplex(&x0, steps)).with_sd_tolerance(tolerance)?;

    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(max_iterations as u64))
        .run()?;

    let state = res.state();
    let best = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| DistError::Optimization("optimizer produced no parameters".into()))?;
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );

    Ok(SolverOutcome {
        best,
        cost: state.get_best_cost(),
        iterations: state.get_iter() as usize,
        converged,
    })
}
