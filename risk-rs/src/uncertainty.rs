//! Bootstrap of risk days under parameter uncertainty.
//!
//! All draws are made up front from one explicitly seeded generator, one batch
//! per parameter, so draw `i` of every parameter belongs to bootstrap sample
//! `i`. The integrations themselves are pure and are handed to an
//! [`EvaluationStrategy`], which returns them in draw order.

use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::parameters::{EpidemiologicalParameters, UncertaintySettings};
use crate::sampling::{draw_gamma, draw_truncated_normal, draw_uniform, quantile_sorted};
use crate::strategy::{EvaluationStrategy, Pooled, Sequential};
use crate::window::{WindowParameters, risk_days};

/// Two-sided empirical quantile interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Quantiles at `alpha / 2` and `1 - alpha / 2`.
    pub fn from_samples(samples: &[f64], alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(RiskError::invalid(
                "alpha",
                format!("must lie strictly between 0 and 1, got {alpha}"),
            ));
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(ConfidenceInterval {
            lower: quantile_sorted(&sorted, alpha / 2.0)?,
            upper: quantile_sorted(&sorted, 1.0 - alpha / 2.0)?,
        })
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }
}

/// Draw-aligned samples of the uncertain inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDraws {
    pub doubling_time: Vec<f64>,
    pub k: Vec<f64>,
    pub lod50: Vec<f64>,
    pub volume_transfused: Vec<f64>,
}

impl ParameterDraws {
    /// Draws in the order doubling time, k, LOD50, transfused volume.
    pub fn generate<R: Rng + ?Sized>(
        params: &EpidemiologicalParameters,
        n: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let doubling_time = draw_truncated_normal(
            rng,
            "doubling_time",
            params.doubling_time,
            params.doubling_time_sd,
            n,
        )?;
        let k = draw_gamma(rng, "k", params.k_gamma_shape, params.k_gamma_scale, n)?;
        let lod50 = draw_truncated_normal(rng, "lod50", params.lod50, params.lod50_sd, n)?;
        let volume_transfused =
            draw_uniform(rng, "volume_transfused", params.volume_transfused_range, n)?;
        Ok(ParameterDraws {
            doubling_time,
            k,
            lod50,
            volume_transfused,
        })
    }

    pub fn len(&self) -> usize {
        self.doubling_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doubling_time.is_empty()
    }

    /// `nominal` with draw `i` substituted for every uncertain input.
    pub fn window(&self, nominal: &WindowParameters, i: usize) -> WindowParameters {
        let mut window = *nominal;
        window.doubling_time = self.doubling_time[i];
        window.k = self.k[i];
        window.volume_transfused = self.volume_transfused[i];
        window.assay.lod50 = self.lod50[i];
        window
    }

    pub fn windows(&self, nominal: &WindowParameters) -> Vec<WindowParameters> {
        (0..self.len()).map(|i| self.window(nominal, i)).collect()
    }
}

/// Point estimate, interval and draw-ordered samples of risk days.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskDaysBootstrap {
    pub point_estimate: f64,
    pub interval: ConfidenceInterval,
    pub samples: Vec<f64>,
}

/// Bootstrap risk days with a generator seeded from `settings.seed`.
pub fn bootstrap_risk_days<S: EvaluationStrategy>(
    params: &EpidemiologicalParameters,
    settings: &UncertaintySettings,
    strategy: &S,
) -> Result<RiskDaysBootstrap> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    bootstrap_risk_days_with_rng(params, settings, strategy, &mut rng)
}

/// Bootstrap risk days drawing from a caller-supplied generator.
pub fn bootstrap_risk_days_with_rng<S, R>(
    params: &EpidemiologicalParameters,
    settings: &UncertaintySettings,
    strategy: &S,
    rng: &mut R,
) -> Result<RiskDaysBootstrap>
where
    S: EvaluationStrategy,
    R: Rng + ?Sized,
{
    settings.validate()?;
    if settings.n_bs == 0 {
        return Err(RiskError::invalid("n_bs", "a bootstrap needs at least one draw"));
    }
    let nominal = params.nominal();
    let point_estimate = risk_days(&nominal)?;

    let draws = ParameterDraws::generate(params, settings.n_bs, rng)?;
    info!(
        "bootstrapping risk days: n_bs={}, workers={}",
        settings.n_bs,
        strategy.workers()
    );
    let samples = strategy.map(draws.windows(&nominal), |window| risk_days(&window))?;
    let interval = ConfidenceInterval::from_samples(&samples, settings.alpha)?;
    info!(
        "risk days {point_estimate:.6} ({:.6}, {:.6})",
        interval.lower, interval.upper
    );
    Ok(RiskDaysBootstrap {
        point_estimate,
        interval,
        samples,
    })
}

/// Serial bootstrap of risk days.
pub fn iwp_bs(
    params: &EpidemiologicalParameters,
    settings: &UncertaintySettings,
) -> Result<RiskDaysBootstrap> {
    bootstrap_risk_days(params, settings, &Sequential)
}

/// Bootstrap of risk days on a pool of `workers` threads.
pub fn iwp_bs_par(
    params: &EpidemiologicalParameters,
    settings: &UncertaintySettings,
    workers: usize,
) -> Result<RiskDaysBootstrap> {
    bootstrap_risk_days(params, settings, &Pooled::new(workers))
}
