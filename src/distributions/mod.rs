//! Capability-record distributions.
//!
//! A [`DistributionSpec`] describes a family: its shape parameters, support
//! and whichever analytic members are known. Binding shape values (and an
//! optional location/scale transform) yields a [`Distribution`], which answers
//! every query either from a supplied member or from a numerical fallback.

mod domain;
mod instance;
mod sampling;
mod spec;
mod table;

pub use domain::{Domain, ParamDef, Transform};
pub use instance::Distribution;
pub use sampling::SamplingStrategy;
pub use spec::{
    DistributionSpec, DistributionSpecBuilder, EntropyFn, FitStartFn, Member, Moments,
    RawMomentFn, SamplerFn, ScalarFn, StatsFn, ValidatorFn,
};
pub use table::{QuantileMethod, QuantilePolicy, QuantileTable};
