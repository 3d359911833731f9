use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DistError {
    #[error("Invalid parameter '{param}' for {distribution}: {reason}")]
    InvalidParameter {
        distribution: String,
        param: String,
        reason: String,
    },

    #[error("{operation} did not converge within {iterations} iterations")]
    NumericalNonconvergence {
        operation: &'static str,
        iterations: usize,
    },

    #[error("Fit did not converge after {iterations} iterations (best estimate: {best:?})")]
    FitConvergence {
        iterations: usize,
        best: HashMap<String, f64>,
    },

    #[error("{distribution} cannot provide {operation}: no supplied member it can be derived from")]
    UnsupportedOperation {
        distribution: String,
        operation: &'static str,
    },

    #[error("Unknown parameter '{param}' for {distribution}")]
    UnknownParameter { distribution: String, param: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Optimization failed: {0}")]
    Optimization(String),
}

impl From<argmin::core::Error> for DistError {
    fn from(e: argmin::core::Error) -> Self {
        // Errors raised by our own cost function keep their variant.
        match e.downcast::<DistError>() {
            Ok(d) => d,
            Err(e) => DistError::Optimization(e.to_string()),
        }
    }
}
