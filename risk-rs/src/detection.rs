//! Pooled NAT screening: probability an infected donation escapes detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::growth::concentration;
use crate::sampling::standard_normal_cdf;

/// One-sided 95th percentile of the standard normal.
pub const DEFAULT_Z: f64 = 1.6449;

/// Number of donations combined into one test sample. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u32")]
pub struct PoolSize(u32);

impl PoolSize {
    pub fn new(n: u32) -> Result<Self> {
        if n < 1 {
            return Err(RiskError::invalid(
                "pool_size",
                format!("must be an integer of at least 1, got {n}"),
            ));
        }
        Ok(PoolSize(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<f64> for PoolSize {
    type Error = RiskError;

    fn try_from(value: f64) -> Result<Self> {
        let n = whole_number("pool_size", value, 1)?;
        PoolSize::new(n)
    }
}

impl TryFrom<i64> for PoolSize {
    type Error = RiskError;

    fn try_from(value: i64) -> Result<Self> {
        let n = u32::try_from(value).map_err(|_| {
            RiskError::invalid("pool_size", format!("must be an integer of at least 1, got {value}"))
        })?;
        PoolSize::new(n)
    }
}

impl From<PoolSize> for u32 {
    fn from(pool_size: PoolSize) -> u32 {
        pool_size.0
    }
}

impl fmt::Display for PoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of individual retests run on a reactive pool. May be 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u32")]
pub struct Retests(u32);

impl Retests {
    pub fn new(n: u32) -> Self {
        Retests(n)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<f64> for Retests {
    type Error = RiskError;

    fn try_from(value: f64) -> Result<Self> {
        whole_number("retests", value, 0).map(Retests)
    }
}

impl TryFrom<i64> for Retests {
    type Error = RiskError;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value).map(Retests).map_err(|_| {
            RiskError::invalid("retests", format!("must be a non-negative integer, got {value}"))
        })
    }
}

impl From<Retests> for u32 {
    fn from(retests: Retests) -> u32 {
        retests.0
    }
}

impl fmt::Display for Retests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn whole_number(name: &'static str, value: f64, min: u32) -> Result<u32> {
    let expected = if min == 0 {
        "a non-negative integer".to_string()
    } else {
        format!("an integer of at least {min}")
    };
    if !value.is_finite() || value.fract() != 0.0 || value < f64::from(min) || value > f64::from(u32::MAX)
    {
        return Err(RiskError::invalid(name, format!("must be {expected}, got {value}")));
    }
    Ok(value as u32)
}

/// Log-probit position of concentration `c` relative to `reference`.
fn log_probit(c: f64, reference: f64, lod95_lod50_ratio: f64, z: f64) -> f64 {
    z * ((c / reference).log10() / lod95_lod50_ratio.log10())
}

/// Probability that a pool holding one donation at concentration `c` (copies)
/// screens positive. Dilution by the pool size enters through the LOD.
pub fn prob_pos_init(c: f64, pool_size: PoolSize, lod50: f64, lod95_lod50_ratio: f64, z: f64) -> f64 {
    let x = log_probit(c, f64::from(pool_size.get()) * lod50, lod95_lod50_ratio, z);
    standard_normal_cdf(x)
}

/// Probability that every retest of a reactive pool comes back negative.
///
/// Retests run on the undiluted donation. With no retests a reactive pool is
/// never cleared, so the probability is 0.
pub fn prob_neg_retest(c: f64, lod50: f64, lod95_lod50_ratio: f64, retests: Retests, z: f64) -> f64 {
    if retests.get() == 0 {
        return 0.0;
    }
    let x = log_probit(c, lod50, lod95_lod50_ratio, z);
    (1.0 - standard_normal_cdf(x)).powf(f64::from(retests.get()))
}

/// Assay and pooling protocol of a screening programme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PooledAssay {
    pub pool_size: PoolSize,
    pub lod50: f64,
    pub lod95_lod50_ratio: f64,
    pub retests: Retests,
    pub z: f64,
}

impl PooledAssay {
    pub fn prob_pos_init(&self, c: f64) -> f64 {
        prob_pos_init(c, self.pool_size, self.lod50, self.lod95_lod50_ratio, self.z)
    }

    pub fn prob_neg_retest(&self, c: f64) -> f64 {
        prob_neg_retest(c, self.lod50, self.lod95_lod50_ratio, self.retests, self.z)
    }

    /// Probability of missing a donation at copy concentration `c`: either the
    /// pool never reacts, or it reacts and every retest clears it.
    pub fn prob_nondetection_at(&self, c: f64) -> f64 {
        1.0 - self.prob_pos_init(c) * (1.0 - self.prob_neg_retest(c))
    }
}

/// Probability the screen misses a donation `t` days after infection.
pub fn prob_nondetection(
    t: f64,
    copies_per_virion: f64,
    c0: f64,
    doubling_time: f64,
    assay: &PooledAssay,
) -> f64 {
    let copies = copies_per_virion * concentration(c0, doubling_time, t);
    assay.prob_nondetection_at(copies)
}
