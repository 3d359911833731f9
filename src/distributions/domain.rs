use std::fmt;

// Free coordinates are clamped here; exp(30) already dwarfs any sensible scale.
const FREE_LIMIT: f64 = 30.0;
const INTERVAL_EDGE: f64 = 1e-10;

/// Bijection between a parameter's domain and the whole real line.
///
/// Fits search over the free coordinate, so any optimizer proposal maps back
/// to a legal parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transform {
    Identity,
    /// `exp` onto the positive half-line.
    Exp,
    /// Scaled logistic onto the open interval `(lower, upper)`.
    Logistic { lower: f64, upper: f64 },
}

impl Transform {
    /// Parameter value to free coordinate. Values on or past a boundary are
    /// pulled just inside it.
    pub fn to_free(self, value: f64) -> f64 {
        match self {
            Transform::Identity => value,
            Transform::Exp => value.ln().max(-FREE_LIMIT),
            Transform::Logistic { lower, upper } => {
                let u = (value - lower) / (upper - lower);
                let u = u.clamp(INTERVAL_EDGE, 1.0 - INTERVAL_EDGE);
                u.ln() - (-u).ln_1p()
            }
        }
    }

    /// Free coordinate back to a parameter value.
    pub fn to_domain(self, eta: f64) -> f64 {
        match self {
            Transform::Identity => eta,
            Transform::Exp => eta.min(FREE_LIMIT).exp(),
            Transform::Logistic { lower, upper } => {
                let eta = eta.clamp(-FREE_LIMIT, FREE_LIMIT);
                lower + (upper - lower) / (1.0 + (-eta).exp())
            }
        }
    }
}

/// Domain constraint of a shape parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    /// Any finite real number.
    Real,
    /// Finite and strictly greater than zero.
    Positive,
    /// Finite and greater than or equal to zero.
    NonNegative,
    /// Strictly between zero and one.
    UnitInterval,
    /// Strictly between `lower` and `upper`.
    Interval { lower: f64, upper: f64 },
}

impl Domain {
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            Domain::Real => true,
            Domain::Positive => value > 0.0,
            Domain::NonNegative => value >= 0.0,
            Domain::UnitInterval => value > 0.0 && value < 1.0,
            Domain::Interval { lower, upper } => value > lower && value < upper,
        }
    }

    /// Transform the fitter uses for a parameter in this domain.
    pub fn transform(&self) -> Transform {
        match *self {
            Domain::Real => Transform::Identity,
            Domain::Positive | Domain::NonNegative => Transform::Exp,
            Domain::UnitInterval => Transform::Logistic {
                lower: 0.0,
                upper: 1.0,
            },
            Domain::Interval { lower, upper } => Transform::Logistic { lower, upper },
        }
    }

    /// A value inside the domain, used when nothing better is known.
    pub fn typical_value(&self) -> f64 {
        match *self {
            Domain::Real => 0.0,
            Domain::Positive | Domain::NonNegative => 1.0,
            Domain::UnitInterval => 0.5,
            Domain::Interval { lower, upper } => 0.5 * (lower + upper),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Real => write!(f, "finite real"),
            Domain::Positive => write!(f, "> 0"),
            Domain::NonNegative => write!(f, ">= 0"),
            Domain::UnitInterval => write!(f, "in (0, 1)"),
            Domain::Interval { lower, upper } => write!(f, "in ({lower}, {upper})"),
        }
    }
}

/// Name and domain of one shape parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamDef {
    pub name: String,
    pub domain: Domain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_contains() {
        assert!(Domain::Real.contains(-3.0));
        assert!(!Domain::Real.contains(f64::NAN));
        assert!(!Domain::Real.contains(f64::INFINITY));
        assert!(!Domain::Positive.contains(0.0));
        assert!(Domain::NonNegative.contains(0.0));
        assert!(!Domain::UnitInterval.contains(1.0));
        assert!(Domain::Interval {
            lower: 2.0,
            upper: 3.0
        }
        .contains(2.5));
    }

    #[test]
    fn test_transforms_round_trip_inside_domain() {
        let cases = [
            (Domain::Real, -4.2),
            (Domain::Positive, 0.37),
            (Domain::UnitInterval, 0.83),
            (
                Domain::Interval {
                    lower: -1.0,
                    upper: 4.0,
                },
                2.2,
            ),
        ];
        for (domain, value) in cases {
            let t = domain.transform();
            let back = t.to_domain(t.to_free(value));
            assert!(
                (back - value).abs() < 1e-9,
                "transform round trip failed for {:?}: {} -> {}",
                domain,
                value,
                back
            );
        }
    }

    #[test]
    fn test_free_coordinates_land_in_domain() {
        for domain in [
            Domain::Positive,
            Domain::UnitInterval,
            Domain::Interval {
                lower: 0.0,
                upper: 10.0,
            },
        ] {
            let t = domain.transform();
            for eta in [-25.0, -1.0, 0.0, 1.0, 25.0] {
                assert!(domain.contains(t.to_domain(eta)));
            }
        }
    }

    #[test]
    fn test_boundary_values_map_to_finite_free_coordinates() {
        assert_eq!(Transform::Exp.to_free(0.0), -FREE_LIMIT);
        let unit = Domain::UnitInterval.transform();
        assert!(unit.to_free(0.0).is_finite());
        assert!(unit.to_free(1.0).is_finite());
        assert!(unit.to_free(1.0) > 20.0);
        assert_eq!(unit.to_free(0.5), 0.0);
    }
}
