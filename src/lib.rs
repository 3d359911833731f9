//! Continuous probability distributions from partial definitions.
//!
//! A family is described once as a [`DistributionSpec`]: its shape
//! parameters, support and whichever analytic members are known (density,
//! cumulative, quantile, moments, sampler, ...). Binding values produces a
//! [`Distribution`] that answers every query, calling the supplied member
//! when there is one and falling back to root finding, quadrature or
//! numerical differentiation when there is not.
//!
//! ```no_run
//! use contdist_rs::{emg, EmgVariant, FitOptions};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let spec = emg(EmgVariant::Decomposed)?;
//! let dist = spec.distribution(&[0.0, 1.0, 0.5])?;
//! let draws = dist.sample(10_000, &mut StdRng::seed_from_u64(42))?;
//!
//! let options = FitOptions::default()
//!     .with_fixed("loc", 0.0)
//!     .with_fixed("scale", 1.0);
//! let fitted = spec.fit(&draws, &options)?;
//! println!("lambda = {:?}", fitted.get("lambda"));
//! # Ok::<(), contdist_rs::DistError>(())
//! ```

pub mod diagnostics;
pub mod distributions;
mod error;
pub mod families;
pub mod fitting;
mod math;
pub mod numeric;
pub mod preprocessing;
mod types;

pub use diagnostics::GoodnessOfFit;
pub use distributions::{
    Distribution, DistributionSpec, Domain, Member, Moments, QuantileMethod, QuantilePolicy,
    SamplingStrategy, Transform,
};
pub use error::DistError;
pub use families::{emg, exponential, normal, EmgVariant};
pub use fitting::{FitMethod, FitOptions, FitResult};
pub use math::{ln_std_normal_cdf, std_normal_cdf, std_normal_pdf, std_normal_ppf};
pub use numeric::NumericConfig;
pub use preprocessing::SampleSummary;
pub use types::ParamVector;
