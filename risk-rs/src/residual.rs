//! Residual risk: risk days scaled by incidence, per `per` transfused units.

use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::parameters::{EpidemiologicalParameters, UncertaintySettings};
use crate::sampling::{draw_gamma, draw_truncated_normal, draw_uniform, std_dev};
use crate::strategy::EvaluationStrategy;
use crate::uncertainty::{ConfidenceInterval, ParameterDraws};
use crate::window::risk_days;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Residual risk for an annual `incidence` and a risk-days value.
pub fn residual_risk_point(incidence: f64, risk_days: f64, per: f64) -> f64 {
    incidence * risk_days / DAYS_PER_YEAR * per
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRiskEstimate {
    pub point_estimate: f64,
    pub interval: ConfidenceInterval,
    pub standard_error: f64,
}

impl ResidualRiskEstimate {
    fn from_samples(point_estimate: f64, samples: &[f64], alpha: f64) -> Result<Self> {
        Ok(ResidualRiskEstimate {
            point_estimate,
            interval: ConfidenceInterval::from_samples(samples, alpha)?,
            standard_error: std_dev(samples),
        })
    }
}

/// One bootstrap draw of the fused computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRiskDraw {
    pub risk_days: f64,
    pub residual_risk: f64,
}

/// Result of [`residual_risk`]; which variant depends on whether draws were
/// requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ResidualRisk {
    /// `n_bs == 0`: point estimates only.
    PointEstimate { risk_days: f64, residual_risk: f64 },
    WithUncertainty {
        risk_days: f64,
        risk_days_interval: ConfidenceInterval,
        residual_risk: ResidualRiskEstimate,
        /// Per-draw values in draw order.
        draws: Vec<ResidualRiskDraw>,
    },
}

impl ResidualRisk {
    pub fn risk_days(&self) -> f64 {
        match self {
            ResidualRisk::PointEstimate { risk_days, .. }
            | ResidualRisk::WithUncertainty { risk_days, .. } => *risk_days,
        }
    }

    pub fn residual_risk(&self) -> f64 {
        match self {
            ResidualRisk::PointEstimate { residual_risk, .. } => *residual_risk,
            ResidualRisk::WithUncertainty { residual_risk, .. } => residual_risk.point_estimate,
        }
    }
}

/// Residual risk from an existing risk-days bootstrap.
///
/// Incidence is drawn once per supplied sample from a generator reseeded with
/// `seed`, and paired with the sample of the same index. The interval spans
/// the `alpha / 2` and `1 - alpha / 2` quantiles, so it follows `alpha`
/// rather than fixed 2.5% and 97.5% bounds.
pub fn residual_risk_iwp(
    iwp_pe: f64,
    iwp_samples: &[f64],
    incidence: f64,
    incidence_sd: f64,
    per: f64,
    alpha: f64,
    seed: u64,
) -> Result<ResidualRiskEstimate> {
    let mut rng = StdRng::seed_from_u64(seed);
    residual_risk_iwp_with_rng(iwp_pe, iwp_samples, incidence, incidence_sd, per, alpha, &mut rng)
}

pub fn residual_risk_iwp_with_rng<R: Rng + ?Sized>(
    iwp_pe: f64,
    iwp_samples: &[f64],
    incidence: f64,
    incidence_sd: f64,
    per: f64,
    alpha: f64,
    rng: &mut R,
) -> Result<ResidualRiskEstimate> {
    if iwp_samples.is_empty() {
        return Err(RiskError::invalid("iwp_samples", "no risk-days samples supplied"));
    }
    let rr_pe = residual_risk_point(incidence, iwp_pe, per);
    let incidence_draws =
        draw_truncated_normal(rng, "incidence", incidence, incidence_sd, iwp_samples.len())?;
    let rr: Vec<f64> = incidence_draws
        .iter()
        .zip(iwp_samples)
        .map(|(&inc, &iwp)| residual_risk_point(inc, iwp, per))
        .collect();
    ResidualRiskEstimate::from_samples(rr_pe, &rr, alpha)
}

/// End-to-end residual risk.
///
/// Computes the risk-days point estimate and, when `settings.n_bs > 0`, a
/// fresh bootstrap in which every draw carries its own incidence sample. The
/// draw order is doubling time, transfused volume, k, LOD50, incidence.
pub fn residual_risk<S: EvaluationStrategy>(
    params: &EpidemiologicalParameters,
    settings: &UncertaintySettings,
    strategy: &S,
) -> Result<ResidualRisk> {
    settings.validate()?;
    let nominal = params.nominal();
    let iwp_pe = risk_days(&nominal)?;
    let rr_pe = residual_risk_point(params.incidence, iwp_pe, settings.per);
    if settings.n_bs == 0 {
        return Ok(ResidualRisk::PointEstimate {
            risk_days: iwp_pe,
            residual_risk: rr_pe,
        });
    }

    let n = settings.n_bs;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let doubling_time = draw_truncated_normal(
        &mut rng,
        "doubling_time",
        params.doubling_time,
        params.doubling_time_sd,
        n,
    )?;
    let volume_transfused =
        draw_uniform(&mut rng, "volume_transfused", params.volume_transfused_range, n)?;
    let k = draw_gamma(&mut rng, "k", params.k_gamma_shape, params.k_gamma_scale, n)?;
    let lod50 = draw_truncated_normal(&mut rng, "lod50", params.lod50, params.lod50_sd, n)?;
    let incidence =
        draw_truncated_normal(&mut rng, "incidence", params.incidence, params.incidence_sd, n)?;
    let draws = ParameterDraws {
        doubling_time,
        k,
        lod50,
        volume_transfused,
    };

    info!(
        "propagating residual risk uncertainty: n_bs={n}, workers={}",
        strategy.workers()
    );
    let per = settings.per;
    let tasks: Vec<_> = draws.windows(&nominal).into_iter().zip(incidence).collect();
    let outcomes = strategy.map(tasks, |(window, incidence)| {
        let iwp = risk_days(&window)?;
        Ok(ResidualRiskDraw {
            risk_days: iwp,
            residual_risk: residual_risk_point(incidence, iwp, per),
        })
    })?;

    let iwp: Vec<f64> = outcomes.iter().map(|d| d.risk_days).collect();
    let rr: Vec<f64> = outcomes.iter().map(|d| d.residual_risk).collect();
    let risk_days_interval = ConfidenceInterval::from_samples(&iwp, settings.alpha)?;
    let residual_risk = ResidualRiskEstimate::from_samples(rr_pe, &rr, settings.alpha)?;
    info!(
        "residual risk per {per:e}: {rr_pe:.6} ({:.6}, {:.6})",
        residual_risk.interval.lower, residual_risk.interval.upper
    );
    Ok(ResidualRisk::WithUncertainty {
        risk_days: iwp_pe,
        risk_days_interval,
        residual_risk,
        draws: outcomes,
    })
}
