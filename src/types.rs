use argmin_math::{ArgminAdd, ArgminMul, ArgminSub};
use ndarray::Array1;
use std::ops::{Deref, DerefMut};

// ----- Newtype for optimizer parameters

/// Free coordinates of a fit (unconstrained reals).
///
/// Layout: the shape parameters being estimated, in spec order, followed by
/// `loc` and `scale` when those are free.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParamVector(pub Array1<f64>);

impl ParamVector {
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }
}

impl ArgminAdd<ParamVector, ParamVector> for ParamVector {
    fn add(&self, other: &Self) -> Self {
        Self(&self.0 + &other.0)
    }
}

impl ArgminSub<ParamVector, ParamVector> for ParamVector {
    fn sub(&self, other: &Self) -> Self {
        Self(&self.0 - &other.0)
    }
}

impl ArgminMul<f64, ParamVector> for ParamVector {
    fn mul(&self, scalar: &f64) -> Self {
        Self(&self.0 * *scalar)
    }
}

impl Deref for ParamVector {
    type Target = Array1<f64>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ParamVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<f64>> for ParamVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}
