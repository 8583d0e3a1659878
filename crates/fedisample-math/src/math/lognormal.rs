//! Three-parameter log-normal fitting by maximum likelihood.
//!
//! Shape (sigma) and scale (exp mu) have closed-form estimates once the
//! location is fixed, so the location is found by golden-section search on
//! the profile log-likelihood over `(min - span, min)`.

use serde::Serialize;
use thiserror::Error;

use crate::math::describe::mean;
use crate::math::stable::LOG_SQRT_2PI;

const MIN_SAMPLES: usize = 3;
const SIGMA_MIN: f64 = 1e-12;
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// A fitted log-normal distribution.
///
/// `degenerate` marks a column the fit could not characterize (all values
/// equal); its density is treated as uniform, i.e. a 0.0 log-density
/// contribution for every observation.
#[derive(Debug, Clone, Serialize)]
pub struct LogNormal {
    /// Sigma of the underlying normal.
    pub shape: f64,
    /// Shift applied before taking logs; always below the sample minimum.
    pub location: f64,
    /// exp(mu) of the underlying normal.
    pub scale: f64,
    /// Whether the fit fell back to a uniform density.
    pub degenerate: bool,
}

/// Errors raised while fitting a column.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("not enough samples: {n} (min {min})")]
    NotEnoughSamples { n: usize, min: usize },
}

/// Fit a log-normal to a column by maximum likelihood.
///
/// A constant column yields a `degenerate` fit rather than an error; the
/// caller decides how loudly to report it.
pub fn fit_lognormal(values: &[f64]) -> Result<LogNormal, FitError> {
    let cleaned: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if cleaned.len() < MIN_SAMPLES {
        return Err(FitError::NotEnoughSamples {
            n: cleaned.len(),
            min: MIN_SAMPLES,
        });
    }
    let min = cleaned.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = cleaned.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span == 0.0 {
        return Ok(LogNormal {
            shape: 0.0,
            location: min,
            scale: 1.0,
            degenerate: true,
        });
    }

    // The likelihood is unbounded as the location approaches the sample
    // minimum (the usual threshold-parameter degeneracy), so the search
    // stops a fixed margin short of it. If the margin underflows to
    // nothing the column is numerically constant.
    let lo = min - span;
    let hi = min - 1e-3 * span;
    if !(hi < min) {
        return Ok(LogNormal {
            shape: 0.0,
            location: min,
            scale: 1.0,
            degenerate: true,
        });
    }
    let location = golden_max(lo, hi, 1e-10 * span, |loc| {
        profile_log_likelihood(&cleaned, loc)
    });
    let (mu, sigma) = shifted_log_moments(&cleaned, location);
    Ok(LogNormal {
        shape: sigma.max(SIGMA_MIN),
        location,
        scale: mu.exp(),
        degenerate: false,
    })
}

impl LogNormal {
    /// Log-density of `x` under this fit.
    ///
    /// Degenerate fits contribute a flat 0.0; values at or below the
    /// location have zero density and return -inf (callers clamp).
    pub fn logpdf(&self, x: f64) -> f64 {
        if self.degenerate {
            return 0.0;
        }
        if x <= self.location || !x.is_finite() {
            return f64::NEG_INFINITY;
        }
        let shifted = x - self.location;
        let z = (shifted.ln() - self.scale.ln()) / self.shape;
        -shifted.ln() - self.shape.ln() - LOG_SQRT_2PI - 0.5 * z * z
    }
}

/// Mean and population sigma of `ln(x - location)`.
fn shifted_log_moments(values: &[f64], location: f64) -> (f64, f64) {
    let logs: Vec<f64> = values.iter().map(|v| (v - location).ln()).collect();
    let mu = mean(&logs);
    let var = logs.iter().map(|z| (z - mu) * (z - mu)).sum::<f64>() / logs.len() as f64;
    (mu, var.sqrt())
}

/// Profile log-likelihood of the location parameter.
///
/// With mu and sigma at their conditional MLEs the data term collapses to
/// n/2, leaving `-sum(z) - n*ln(sigma) - n*(ln sqrt(2*pi) + 1/2)`.
fn profile_log_likelihood(values: &[f64], location: f64) -> f64 {
    let n = values.len() as f64;
    let (_, sigma) = shifted_log_moments(values, location);
    let sigma = sigma.max(SIGMA_MIN);
    let sum_logs: f64 = values.iter().map(|v| (v - location).ln()).sum();
    -sum_logs - n * sigma.ln() - n * (LOG_SQRT_2PI + 0.5)
}

/// Golden-section search for the maximum of `f` on `[lo, hi]`.
fn golden_max(lo: f64, hi: f64, tol: f64, f: impl Fn(f64) -> f64) -> f64 {
    let mut a = lo;
    let mut b = hi;
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..100 {
        if (b - a).abs() <= tol {
            break;
        }
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}
