//! Numerical backend used by the distribution fallbacks.
//!
//! Three contracts are provided, all driven by a [`NumericConfig`]:
//! - root finding: Brent's method on a bracketed interval, plus geometric bracket
//!   expansion for monotone functions,
//! - quadrature: adaptive Gauss-Kronrod (7/15) with interval bisection; infinite
//!   ends are mapped onto finite ones with a scaled rational substitution,
//! - differentiation: central differences with Richardson extrapolation (Ridders).
//!
//! Every routine takes a fallible integrand/objective so errors raised while
//! evaluating a derived member propagate instead of turning into NaN.

use crate::error::DistError;

const DEFAULT_TOLERANCE: f64 = 1e-10;
const DEFAULT_MAX_ITER: usize = 200;
const DEFAULT_MAX_SUBDIVISIONS: usize = 2000;
const DEFAULT_DERIVATIVE_STEP: f64 = 1e-3;

/// Tolerance and iteration budget shared by all numerical fallbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericConfig {
    /// Absolute tolerance for roots; absolute/relative tolerance for integrals.
    pub tolerance: f64,
    /// Iteration budget for root finding, bracketing and table widening.
    pub max_iterations: usize,
    /// Maximum number of intervals the adaptive quadrature may hold.
    pub max_subdivisions: usize,
    /// Initial step of the derivative estimate, relative to `max(|x|, 1)`.
    pub derivative_step: f64,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITER,
            max_subdivisions: DEFAULT_MAX_SUBDIVISIONS,
            derivative_step: DEFAULT_DERIVATIVE_STEP,
        }
    }
}

impl NumericConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_subdivisions(mut self, max_subdivisions: usize) -> Self {
        self.max_subdivisions = max_subdivisions;
        self
    }
}

// ----- Root finding

/// Finds a root of `f` in `[a, b]` with Brent's method.
///
/// `f(a)` and `f(b)` must have opposite signs (or one of them be zero).
/// The returned root is accurate to `config.tolerance` in x.
pub fn find_root<F>(mut f: F, a: f64, b: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a)?;
    let mut fb = f(b)?;

    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.is_nan() || fb.is_nan() || fa.signum() == fb.signum() {
        return Err(DistError::InvalidInput(format!(
            "root is not bracketed by [{a}, {b}] (f(a)={fa}, f(b)={fb})"
        )));
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..config.max_iterations {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * config.tolerance;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, or secant when only two points differ.
            let s = fb / fa;
            let mut p;
            let mut q;
            if a == c {
                p = 2.0 * xm * s;
                q = 1.0 - s;
            } else {
                let q0 = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * xm * q0 * (q0 - r) - (b - a) * (r - 1.0));
                q = (q0 - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
        fb = f(b)?;
        if fb.is_nan() {
            return Err(DistError::InvalidInput(format!(
                "objective evaluated to NaN at x={b}"
            )));
        }
    }

    Err(DistError::NumericalNonconvergence {
        operation: "root finding",
        iterations: config.max_iterations,
    })
}

/// Expands outward from `x0` until a non-decreasing `f` changes sign.
///
/// The search never leaves `bounds`. Returns `(lo, hi)` with `f(lo) <= 0 <= f(hi)`.
pub fn bracket_increasing<F>(
    mut f: F,
    x0: f64,
    step: f64,
    bounds: (f64, f64),
    config: &NumericConfig,
) -> Result<(f64, f64), DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    let (lower, upper) = bounds;
    let x0 = x0.clamp(lower, upper);
    let f0 = f(x0)?;
    if f0 == 0.0 {
        return Ok((x0, x0));
    }

    let mut width = if step.is_finite() && step > 0.0 {
        step
    } else {
        1.0
    };
    let mut anchor = x0;

    for _ in 0..config.max_iterations {
        if f0 < 0.0 {
            let hi = (x0 + width).min(upper);
            if f(hi)? >= 0.0 {
                return Ok((anchor, hi));
            }
            if hi >= upper {
                break;
            }
            anchor = hi;
        } else {
            let lo = (x0 - width).max(lower);
            if f(lo)? <= 0.0 {
                return Ok((lo, anchor));
            }
            if lo <= lower {
                break;
            }
            anchor = lo;
        }
        width *= 2.0;
    }

    Err(DistError::NumericalNonconvergence {
        operation: "root bracketing",
        iterations: config.max_iterations,
    })
}

// ----- Quadrature

// Gauss-Kronrod 7/15 abscissae and weights on [-1, 1] (QUADPACK qk15).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];
// Gauss weights for the 7-point rule, which uses XGK[1], XGK[3], XGK[5], XGK[7].
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn gauss_kronrod<F>(f: &mut F, a: f64, b: f64) -> Result<Segment, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let f_center = f(center)?;
    let mut kronrod = WGK[7] * f_center;
    let mut gauss = WG[3] * f_center;

    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = f(center - dx)? + f(center + dx)?;
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Ok(Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    })
}

fn adaptive<F>(mut f: F, a: f64, b: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    if a == b {
        return Ok(0.0);
    }

    let mut segments = vec![gauss_kronrod(&mut f, a, b)?];
    let max_segments = config.max_subdivisions.max(1);

    loop {
        let total: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();

        if !total.is_finite() || !error.is_finite() {
            return Err(DistError::InvalidInput(format!(
                "integrand is not finite on [{a}, {b}]"
            )));
        }
        if error <= config.tolerance.max(config.tolerance * total.abs()) {
            return Ok(total);
        }
        if segments.len() >= max_segments {
            return Err(DistError::NumericalNonconvergence {
                operation: "quadrature",
                iterations: segments.len(),
            });
        }

        // Bisect the segment with the largest error estimate.
        let (worst, _) = segments
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, s)| {
                if s.error > acc.1 {
                    (i, s.error)
                } else {
                    acc
                }
            });
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid <= seg.a || mid >= seg.b {
            // Interval cannot be split further in floating point.
            return Err(DistError::NumericalNonconvergence {
                operation: "quadrature",
                iterations: segments.len() + 1,
            });
        }
        segments.push(gauss_kronrod(&mut f, seg.a, mid)?);
        segments.push(gauss_kronrod(&mut f, mid, seg.b)?);
    }
}

/// Integrates `f` over `[a, b]`, where either end may be infinite.
///
/// Infinite ends are handled by substitution anchored at `center` with length
/// scale `spread`; choosing them near the bulk of the integrand's mass keeps
/// the number of subdivisions small.
pub fn integrate<F>(
    mut f: F,
    a: f64,
    b: f64,
    center: f64,
    spread: f64,
    config: &NumericConfig,
) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    if a.is_nan() || b.is_nan() {
        return Err(DistError::InvalidInput("integration bounds are NaN".into()));
    }
    if a == b {
        return Ok(0.0);
    }
    let (lo, hi, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };

    let s = if spread.is_finite() && spread > 0.0 {
        spread
    } else {
        1.0
    };

    let value = match (lo.is_finite(), hi.is_finite()) {
        (true, true) => adaptive(&mut f, lo, hi, config)?,
        (true, false) => upper_tail(&mut f, lo, s, config)?,
        (false, true) => lower_tail(&mut f, hi, s, config)?,
        (false, false) => {
            let c = if center.is_finite() { center } else { 0.0 };
            lower_tail(&mut f, c, s, config)? + upper_tail(&mut f, c, s, config)?
        }
    };
    Ok(sign * value)
}

// x = a + s * t / (1 - t), t in [0, 1)
fn upper_tail<F>(f: &mut F, a: f64, s: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    adaptive(
        |t| {
            let fx = f(a + s * t / (1.0 - t))?;
            Ok(if fx == 0.0 {
                0.0
            } else {
                fx * s / ((1.0 - t) * (1.0 - t))
            })
        },
        0.0,
        1.0,
        config,
    )
}

// x = b - s * (1 - t) / t, t in (0, 1]
fn lower_tail<F>(f: &mut F, b: f64, s: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    adaptive(
        |t| {
            let fx = f(b - s * (1.0 - t) / t)?;
            Ok(if fx == 0.0 { 0.0 } else { fx * s / (t * t) })
        },
        0.0,
        1.0,
        config,
    )
}

// ----- Differentiation

const RIDDERS_SHRINK: f64 = 1.4;
const RIDDERS_TABLE: usize = 10;
const RIDDERS_SAFE: f64 = 2.0;

/// Derivative of `f` at `x` by Ridders' extrapolation of central differences.
///
/// Fails with `NumericalNonconvergence` when the extrapolation error does not
/// fall below `sqrt(config.tolerance)` (relative to the derivative's size).
pub fn derivative<F>(mut f: F, x: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    let h0 = config.derivative_step * x.abs().max(1.0);
    // Central differences carry only even powers of h.
    ridders(
        |h| Ok((f(x + h)? - f(x - h)?) / (2.0 * h)),
        h0,
        RIDDERS_SHRINK * RIDDERS_SHRINK,
        config,
    )
}

/// One-sided derivative of `f` at `x`, sampling only `x + t * direction` for
/// `t >= 0`. Used at the ends of a bounded support, where a central stencil
/// would straddle the boundary.
pub fn derivative_one_sided<F>(
    mut f: F,
    x: f64,
    direction: f64,
    config: &NumericConfig,
) -> Result<f64, DistError>
where
    F: FnMut(f64) -> Result<f64, DistError>,
{
    let s = direction.signum();
    let fx = f(x)?;
    let h0 = config.derivative_step * x.abs().max(1.0);
    ridders(
        |h| Ok((f(x + s * h)? - fx) / (s * h)),
        h0,
        RIDDERS_SHRINK,
        config,
    )
}

// Ridders' tableau over a difference quotient whose error expands in powers
// of `h` that shrink by `order_factor` per step.
fn ridders<Q>(mut quotient: Q, h0: f64, order_factor: f64, config: &NumericConfig) -> Result<f64, DistError>
where
    Q: FnMut(f64) -> Result<f64, DistError>,
{
    let n_table = RIDDERS_TABLE.min(config.max_iterations.max(2));
    let mut h = h0;

    let mut table = vec![vec![0.0_f64; n_table]; n_table];
    table[0][0] = quotient(h)?;
    let mut best = table[0][0];
    let mut err = f64::MAX;

    for i in 1..n_table {
        h /= RIDDERS_SHRINK;
        table[0][i] = quotient(h)?;
        let mut fac = order_factor;
        for j in 1..=i {
            table[j][i] = (table[j - 1][i] * fac - table[j - 1][i - 1]) / (fac - 1.0);
            fac *= order_factor;
            let errt = (table[j][i] - table[j - 1][i])
                .abs()
                .max((table[j][i] - table[j - 1][i - 1]).abs());
            if errt <= err {
                err = errt;
                best = table[j][i];
            }
        }
        if (table[i][i] - table[i - 1][i - 1]).abs() >= RIDDERS_SAFE * err {
            break;
        }
    }

    let accept = config.tolerance.sqrt();
    if err <= accept.max(accept * best.abs()) {
        Ok(best)
    } else {
        Err(DistError::NumericalNonconvergence {
            operation: "differentiation",
            iterations: n_table,
        })
    }
}
