//! Interpolated inverse-CDF tables.
//!
//! A table is a strictly increasing list of `(cdf(z), z)` pairs over a range
//! wide enough that the probability mass left outside falls below the
//! policy's tail tolerance. Quantiles are read back by linear interpolation,
//! so the error is bounded by the grid spacing.

use super::instance::Distribution;
use super::spec::Member;
use crate::error::DistError;
use crate::numeric;

const DEFAULT_WIDTH_SD: f64 = 40.0;
const DEFAULT_POINTS: usize = 8192;
const DEFAULT_TAIL_TOLERANCE: f64 = 1e-12;

/// How `ppf` is derived when no analytic quantile is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuantileMethod {
    /// One Brent solve of `cdf(x) = q` per query. Accurate to the numeric tolerance.
    #[default]
    RootFinding,
    /// Lookup in a cached [`QuantileTable`]. Error bounded by the table spacing.
    Table,
}

/// Range and resolution of quantile tables, relative to the distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantilePolicy {
    pub method: QuantileMethod,
    /// Initial half-width of the table in standard deviations around the center.
    pub width_sd: f64,
    /// Number of grid nodes.
    pub points: usize,
    /// Mass allowed beyond either end of the table.
    pub tail_tolerance: f64,
}

impl Default for QuantilePolicy {
    fn default() -> Self {
        Self {
            method: QuantileMethod::RootFinding,
            width_sd: DEFAULT_WIDTH_SD,
            points: DEFAULT_POINTS,
            tail_tolerance: DEFAULT_TAIL_TOLERANCE,
        }
    }
}

impl QuantilePolicy {
    pub fn with_method(mut self, method: QuantileMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_width_sd(mut self, width_sd: f64) -> Self {
        self.width_sd = width_sd;
        self
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_tail_tolerance(mut self, tail_tolerance: f64) -> Self {
        self.tail_tolerance = tail_tolerance;
        self
    }

    fn check(&self) -> Result<(), DistError> {
        if self.points < 2 {
            return Err(DistError::InvalidInput(format!(
                "quantile table needs at least 2 points, got {}",
                self.points
            )));
        }
        if !(self.width_sd.is_finite() && self.width_sd > 0.0) {
            return Err(DistError::InvalidInput(format!(
                "quantile table width must be positive, got {}",
                self.width_sd
            )));
        }
        if !(self.tail_tolerance > 0.0 && self.tail_tolerance < 0.5) {
            return Err(DistError::InvalidInput(format!(
                "tail tolerance must be in (0, 0.5), got {}",
                self.tail_tolerance
            )));
        }
        Ok(())
    }
}

/// Monotone `(cdf, z)` table in standardized coordinates.
#[derive(Debug, Clone)]
pub struct QuantileTable {
    cdfs: Vec<f64>,
    xs: Vec<f64>,
    step: f64,
}

impl QuantileTable {
    pub(crate) fn build(dist: &Distribution) -> Result<Self, DistError> {
        let policy = dist.quantile_policy();
        policy.check()?;
        let config = dist.numeric_config();
        let (a, b) = dist.spec().support();
        let (center, spread) = dist.location_hint();

        let mut lo = (center - policy.width_sd * spread).max(a);
        let mut hi = (center + policy.width_sd * spread).min(b);

        let mut widenings = 0;
        while lo > a && dist.std_cdf(lo)? > policy.tail_tolerance {
            if widenings >= config.max_iterations {
                return Err(DistError::NumericalNonconvergence {
                    operation: "quantile table range",
                    iterations: widenings,
                });
            }
            lo = (center - 2.0 * (center - lo)).max(a);
            widenings += 1;
        }
        while hi < b && dist.std_sf(hi)? > policy.tail_tolerance {
            if widenings >= config.max_iterations {
                return Err(DistError::NumericalNonconvergence {
                    operation: "quantile table range",
                    iterations: widenings,
                });
            }
            hi = (center + 2.0 * (hi - center)).min(b);
            widenings += 1;
        }

        let n = policy.points;
        let step = (hi - lo) / (n - 1) as f64;
        let grid: Vec<f64> = (0..n)
            .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
            .collect();

        let spec = dist.spec();
        let raw = if spec.supplies(Member::Cdf) || spec.supplies(Member::Sf) {
            grid.iter()
                .map(|&z| dist.std_cdf(z))
                .collect::<Result<Vec<f64>, DistError>>()?
        } else {
            // Accumulate the density between neighbouring nodes instead of
            // integrating from the tail for every node.
            let mut acc = dist.std_cdf(lo)?;
            let mut out = Vec::with_capacity(n);
            out.push(acc);
            for pair in grid.windows(2) {
                acc += numeric::integrate(
                    |z| dist.std_pdf(z),
                    pair[0],
                    pair[1],
                    center,
                    spread,
                    config,
                )?;
                out.push(acc.clamp(0.0, 1.0));
            }
            out
        };

        let mut cdfs = Vec::with_capacity(n);
        let mut xs = Vec::with_capacity(n);
        for (&z, &p) in grid.iter().zip(raw.iter()) {
            match cdfs.last() {
                Some(&last) if p <= last => {
                    // A leading plateau keeps its last node so the first
                    // interval ends where mass starts to accumulate.
                    if cdfs.len() == 1 {
                        xs[0] = z;
                    }
                }
                _ => {
                    cdfs.push(p);
                    xs.push(z);
                }
            }
        }

        if cdfs.len() < 2 {
            return Err(DistError::InvalidInput(format!(
                "cdf of {} is flat over [{lo}, {hi}]; cannot build a quantile table",
                spec.name()
            )));
        }

        tracing::debug!(
            distribution = spec.name(),
            points = cdfs.len(),
            lo,
            hi,
            widenings,
            "built quantile table"
        );

        Ok(Self { cdfs, xs, step })
    }

    /// Interpolated standardized quantile. Requests beyond the tabulated
    /// cdf range return the table's end points.
    pub fn quantile(&self, q: f64) -> f64 {
        let last = self.cdfs.len() - 1;
        if q <= self.cdfs[0] {
            return self.xs[0];
        }
        if q >= self.cdfs[last] {
            return self.xs[last];
        }

        let i = self.cdfs.partition_point(|&p| p < q);
        let (p0, p1) = (self.cdfs[i - 1], self.cdfs[i]);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        x0 + (x1 - x0) * (q - p0) / (p1 - p0)
    }

    pub fn len(&self) -> usize {
        self.cdfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cdfs.is_empty()
    }

    /// Standardized range covered by the table.
    pub fn bounds(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Grid spacing in standardized units; bounds the interpolation error of
    /// `quantile` for any q inside the tabulated range.
    pub fn step(&self) -> f64 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::DistributionSpec;
    use crate::math::{std_normal_cdf, std_normal_pdf, std_normal_ppf};

    fn normal(with_cdf: bool) -> Distribution {
        let builder = DistributionSpec::builder("normal").pdf(|z, _| std_normal_pdf(z));
        let builder = if with_cdf {
            builder.cdf(|z, _| std_normal_cdf(z))
        } else {
            builder
        };
        builder
            .build()
            .unwrap()
            .distribution(&[])
            .unwrap()
            .with_quantile_policy(QuantilePolicy::default().with_method(QuantileMethod::Table))
    }

    #[test]
    fn test_table_quantiles_within_step() {
        for with_cdf in [true, false] {
            let d = normal(with_cdf);
            let table = d.quantile_table().unwrap();
            for q in [1e-6, 0.01, 0.3, 0.5, 0.77, 0.999] {
                let err = (table.quantile(q) - std_normal_ppf(q)).abs();
                assert!(
                    err <= table.step(),
                    "q={} err={} step={} (cdf supplied: {})",
                    q,
                    err,
                    table.step(),
                    with_cdf
                );
            }
        }
    }

    #[test]
    fn test_table_is_strictly_increasing_and_covers_tails() {
        let d = normal(true);
        let table = d.quantile_table().unwrap();
        assert!(table.cdfs.windows(2).all(|w| w[0] < w[1]));
        assert!(table.xs.windows(2).all(|w| w[0] < w[1]));
        assert!(table.cdfs[0] <= DEFAULT_TAIL_TOLERANCE);
        assert!(1.0 - table.cdfs[table.len() - 1] <= DEFAULT_TAIL_TOLERANCE);
    }

    #[test]
    fn test_narrow_table_widens_until_tails_are_small() {
        let d = normal(true).with_quantile_policy(
            QuantilePolicy::default()
                .with_method(QuantileMethod::Table)
                .with_width_sd(0.5)
                .with_points(2048),
        );
        let table = d.quantile_table().unwrap();
        let (lo, hi) = table.bounds();
        assert!(std_normal_cdf(lo) <= DEFAULT_TAIL_TOLERANCE);
        assert!(std_normal_cdf(-hi) <= DEFAULT_TAIL_TOLERANCE);
    }

    #[test]
    fn test_ppf_through_table_method() {
        let d = normal(true);
        let x = d.ppf(0.975).unwrap();
        let step = d.quantile_table().unwrap().step();
        assert!((x - 1.959963984540054).abs() <= step);
    }

    #[test]
    fn test_bad_policy_is_rejected() {
        let d = normal(true)
            .with_quantile_policy(QuantilePolicy::default().with_points(1));
        assert!(matches!(
            d.quantile_table(),
            Err(DistError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_out_of_range_requests_clamp_to_edges() {
        let d = normal(true);
        let table = d.quantile_table().unwrap();
        let (lo, hi) = table.bounds();
        assert_eq!(table.quantile(0.0), lo);
        assert_eq!(table.quantile(1.0), hi);
        assert!(!table.is_empty());
    }
}
