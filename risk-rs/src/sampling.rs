//! Random draws and sample statistics used by the resampling layer.
//!
//! Every draw takes the generator explicitly; nothing here touches global
//! state, so a fixed seed fully determines a batch.

use std::f64::consts::SQRT_2;

use log::debug;
use rand::Rng;
use rand::distr::{Distribution, Open01};
use rand_distr::{Gamma, Uniform};
use statrs::function::erf::{erfc, erfc_inv};

use crate::error::{Result, RiskError};

/// Standard normal CDF.
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Normal distribution left-truncated at zero.
///
/// The support is `[0, inf)` whatever the mean; draws below the mean are kept
/// as long as they are non-negative. Sampled by inverting the upper-tail CDF, one uniform per draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormal {
    mean: f64,
    sd: f64,
    // P(X > 0) of the untruncated normal
    upper_mass: f64,
}

impl TruncatedNormal {
    pub fn new(mean: f64, sd: f64) -> Result<Self> {
        if !mean.is_finite() {
            return Err(RiskError::invalid("mean", format!("must be finite, got {mean}")));
        }
        if !sd.is_finite() || sd < 0.0 {
            return Err(RiskError::invalid("sd", format!("must be non-negative, got {sd}")));
        }
        if sd == 0.0 {
            if mean <= 0.0 {
                return Err(RiskError::invalid(
                    "mean",
                    format!("point mass at {mean} lies outside the truncated support"),
                ));
            }
            return Ok(TruncatedNormal {
                mean,
                sd,
                upper_mass: 1.0,
            });
        }
        let upper_mass = standard_normal_cdf(mean / sd);
        if upper_mass <= 0.0 {
            return Err(RiskError::invalid(
                "mean",
                format!("no probability mass above zero for mean {mean} and sd {sd}"),
            ));
        }
        Ok(TruncatedNormal {
            mean,
            sd,
            upper_mass,
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }
}

impl Distribution<f64> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.sd == 0.0 {
            return self.mean;
        }
        let u: f64 = Open01.sample(rng);
        // q in (0, 1) keeps the quantile finite
        let q = u * self.upper_mass;
        (self.mean + self.sd * SQRT_2 * erfc_inv(2.0 * q)).max(0.0)
    }
}

/// `n` draws from a normal left-truncated at zero.
pub fn draw_truncated_normal<R: Rng + ?Sized>(
    rng: &mut R,
    name: &'static str,
    mean: f64,
    sd: f64,
    n: usize,
) -> Result<Vec<f64>> {
    let dist = TruncatedNormal::new(mean, sd).map_err(|e| match e {
        RiskError::InvalidParameter { reason, .. } => RiskError::invalid(name, reason),
        other => other,
    })?;
    debug!("drawing {n} truncated-normal samples for {name} (mean={mean}, sd={sd})");
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}

/// `n` draws from a gamma distribution with the given shape and scale.
pub fn draw_gamma<R: Rng + ?Sized>(
    rng: &mut R,
    name: &'static str,
    shape: f64,
    scale: f64,
    n: usize,
) -> Result<Vec<f64>> {
    let dist = Gamma::new(shape, scale).map_err(|e| RiskError::distribution(name, e))?;
    debug!("drawing {n} gamma samples for {name} (shape={shape}, scale={scale})");
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}

/// `n` uniform draws over `range`.
pub fn draw_uniform<R: Rng + ?Sized>(
    rng: &mut R,
    name: &'static str,
    range: (f64, f64),
    n: usize,
) -> Result<Vec<f64>> {
    let (low, high) = range;
    if !(low <= high) {
        return Err(RiskError::invalid(
            name,
            format!("range ({low}, {high}) must be ordered low to high"),
        ));
    }
    let dist = Uniform::new_inclusive(low, high).map_err(|e| RiskError::distribution(name, e))?;
    debug!("drawing {n} uniform samples for {name} over ({low}, {high})");
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}

/// Empirical quantile with linear interpolation between order statistics.
pub fn quantile(samples: &[f64], q: f64) -> Result<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(RiskError::invalid("samples", "cannot take a quantile of an empty sample"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(RiskError::invalid("q", format!("must lie in [0, 1], got {q}")));
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Population standard deviation (divisor `n`).
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}
