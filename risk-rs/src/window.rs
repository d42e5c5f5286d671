//! Integration of the infectious-and-undetected probability over the window
//! period, giving expected risk days.

use crate::detection::PooledAssay;
use crate::error::{Result, RiskError};
use crate::growth::concentration;
use crate::infectivity::{InfectivityModel, transfused_copies};
use crate::quadrature::GaussKronrod;

/// Finite integration domain in days relative to the reference infection time.
///
/// The natural domain is the whole real line, but the growth term overflows
/// there. The integrand is numerically zero outside these limits for realistic
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationLimits {
    pub lower: f64,
    pub upper: f64,
}

pub const CONTINUOUS_LIMITS: IntegrationLimits = IntegrationLimits {
    lower: -100.0,
    upper: 500.0,
};

pub const WORST_CASE_LIMITS: IntegrationLimits = IntegrationLimits {
    lower: -20.0,
    upper: 100.0,
};

impl InfectivityModel {
    pub fn default_limits(self) -> IntegrationLimits {
        match self {
            InfectivityModel::Continuous => CONTINUOUS_LIMITS,
            InfectivityModel::WorstCase => WORST_CASE_LIMITS,
        }
    }
}

/// Everything one risk-days evaluation needs. Bootstrap draws replace
/// individual fields and pass the vector through unchanged otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowParameters {
    pub copies_per_virion: f64,
    pub c0: f64,
    pub doubling_time: f64,
    pub volume_transfused: f64,
    /// Ignored by the worst-case model.
    pub k: f64,
    pub assay: PooledAssay,
}

pub fn prob_infectious_nondetection(t: f64, params: &WindowParameters) -> f64 {
    joint_probability(InfectivityModel::Continuous, t, params)
}

pub fn prob_infectious_nondetection_wc(t: f64, params: &WindowParameters) -> f64 {
    joint_probability(InfectivityModel::WorstCase, t, params)
}

fn joint_probability(model: InfectivityModel, t: f64, params: &WindowParameters) -> f64 {
    let n_copies = transfused_copies(
        t,
        params.c0,
        params.doubling_time,
        params.volume_transfused,
        params.copies_per_virion,
    );
    let infectious = model.prob_infectious_copies(n_copies, params.k);
    let nondetection = crate::detection::prob_nondetection(
        t,
        params.copies_per_virion,
        params.c0,
        params.doubling_time,
        &params.assay,
    );
    infectious * nondetection
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowIntegrator {
    model: InfectivityModel,
    limits: IntegrationLimits,
    quadrature: GaussKronrod,
}

impl WindowIntegrator {
    pub fn new(model: InfectivityModel) -> Self {
        WindowIntegrator {
            model,
            limits: model.default_limits(),
            quadrature: GaussKronrod::default(),
        }
    }

    pub fn with_limits(mut self, limits: IntegrationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_quadrature(mut self, quadrature: GaussKronrod) -> Self {
        self.quadrature = quadrature;
        self
    }

    pub fn model(&self) -> InfectivityModel {
        self.model
    }

    pub fn limits(&self) -> IntegrationLimits {
        self.limits
    }

    pub fn integrand(&self, t: f64, params: &WindowParameters) -> f64 {
        joint_probability(self.model, t, params)
    }

    /// Fails if viral load overflows anywhere in the domain. Growth is
    /// monotone in `t`, so only the limits need checking.
    fn check_growth(&self, params: &WindowParameters) -> Result<()> {
        for t in [self.limits.lower, self.limits.upper] {
            let c = concentration(params.c0, params.doubling_time, t);
            let checks = [
                ("concentration", c),
                ("copy concentration", params.copies_per_virion * c),
                ("transfused copies", c * params.copies_per_virion * params.volume_transfused),
            ];
            if let Some((context, value)) = checks.into_iter().find(|(_, v)| !v.is_finite()) {
                return Err(RiskError::numerical(context, value));
            }
        }
        Ok(())
    }

    /// Expected days during which a donation is infectious and undetected.
    ///
    /// An overflowing growth term is a [`RiskError::Numerical`], not a zero
    /// integrand.
    pub fn risk_days(&self, params: &WindowParameters) -> Result<f64> {
        self.check_growth(params)?;
        let result = self.quadrature.integrate(
            |t| self.integrand(t, params),
            self.limits.lower,
            self.limits.upper,
        )?;
        if !result.value.is_finite() {
            return Err(RiskError::numerical("risk days", result.value));
        }
        Ok(result.value)
    }
}

impl Default for WindowIntegrator {
    fn default() -> Self {
        WindowIntegrator::new(InfectivityModel::Continuous)
    }
}

/// Risk days under the continuous infectivity model over [`CONTINUOUS_LIMITS`].
pub fn risk_days(params: &WindowParameters) -> Result<f64> {
    WindowIntegrator::new(InfectivityModel::Continuous).risk_days(params)
}

/// Risk days under the worst-case step model over [`WORST_CASE_LIMITS`].
pub fn risk_days_wc(params: &WindowParameters) -> Result<f64> {
    WindowIntegrator::new(InfectivityModel::WorstCase).risk_days(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DEFAULT_Z, PoolSize, Retests};

    // Reference values from an independent 30-digit quadrature of the same
    // integrand split at integer days.
    const SINGLE_NO_RETEST: f64 = 4.3172559695929138;
    const POOL16_ONE_RETEST: f64 = 7.722131281020514;
    const POOL6_TWO_RETESTS: f64 = 6.5232710419351201;
    const SINGLE_NO_RETEST_WC: f64 = 4.170867583869392;
    const POOL16_ONE_RETEST_WC: f64 = 7.577000035452164;

    fn params(pool_size: u32, retests: u32) -> WindowParameters {
        WindowParameters {
            copies_per_virion: 2.0,
            c0: 0.00025,
            doubling_time: 0.85,
            volume_transfused: 20.0,
            k: 0.316,
            assay: PooledAssay {
                pool_size: PoolSize::new(pool_size).unwrap(),
                lod50: 3.0,
                lod95_lod50_ratio: 4.16,
                retests: Retests::new(retests),
                z: DEFAULT_Z,
            },
        }
    }

    fn assert_relative(actual: f64, expected: f64, tol: f64) {
        let rel = f64::abs(actual - expected) / expected;
        assert!(rel < tol, "{actual} vs {expected} (relative error {rel:e})");
    }

    #[test]
    fn test_risk_days_reference_values() {
        assert_relative(risk_days(&params(1, 0)).unwrap(), SINGLE_NO_RETEST, 1e-6);
        assert_relative(risk_days(&params(16, 1)).unwrap(), POOL16_ONE_RETEST, 1e-6);
        assert_relative(risk_days(&params(6, 2)).unwrap(), POOL6_TWO_RETESTS, 1e-6);
    }

    #[test]
    fn test_risk_days_wc_reference_values() {
        assert_relative(risk_days_wc(&params(1, 0)).unwrap(), SINGLE_NO_RETEST_WC, 1e-6);
        assert_relative(risk_days_wc(&params(16, 1)).unwrap(), POOL16_ONE_RETEST_WC, 1e-6);
    }

    #[test]
    fn test_integrand_is_product() {
        let p = params(16, 1);
        for t in [-5.0, 0.0, 4.0, 8.0, 12.0] {
            let infectious = crate::infectivity::prob_infectious(
                t,
                p.c0,
                p.doubling_time,
                p.volume_transfused,
                p.k,
                p.copies_per_virion,
            );
            let missed =
                crate::detection::prob_nondetection(t, p.copies_per_virion, p.c0, p.doubling_time, &p.assay);
            assert_eq!(prob_infectious_nondetection(t, &p), infectious * missed);
        }
    }

    #[test]
    fn test_integrand_is_negligible_at_limits() {
        let p = params(16, 1);
        assert!(prob_infectious_nondetection(CONTINUOUS_LIMITS.lower, &p) < 1e-11);
        assert!(prob_infectious_nondetection(CONTINUOUS_LIMITS.upper, &p) < 1e-11);
        assert_eq!(prob_infectious_nondetection_wc(WORST_CASE_LIMITS.lower, &p), 0.0);
        assert!(prob_infectious_nondetection_wc(WORST_CASE_LIMITS.upper, &p) < 1e-11);
    }

    #[test]
    fn test_more_sensitive_screen_reduces_risk() {
        let pooled = risk_days(&params(16, 1)).unwrap();
        let single = risk_days(&params(1, 1)).unwrap();
        assert!(single < pooled);
    }

    #[test]
    fn test_fast_growth_overflows() {
        let mut p = params(16, 1);
        p.doubling_time = 0.2;
        let err = risk_days(&p).unwrap_err();
        assert!(matches!(err, RiskError::Numerical { context: "concentration", .. }));

        let mut p = params(16, 1);
        p.c0 = 1e300;
        assert!(matches!(risk_days(&p), Err(RiskError::Numerical { .. })));

        let mut p = params(16, 1);
        p.doubling_time = 0.0;
        assert!(matches!(risk_days(&p), Err(RiskError::Numerical { .. })));
    }

    #[test]
    fn test_worst_case_limits_tolerate_faster_growth() {
        let mut p = params(16, 1);
        p.doubling_time = 0.2;
        assert!(risk_days_wc(&p).unwrap() > 0.0);
    }

    #[test]
    fn test_risk_days_scale_with_doubling_time() {
        // concentration depends on t / doubling_time only
        for d in [0.5, 1.0, 1.5] {
            let mut p = params(16, 1);
            p.doubling_time = d;
            assert_relative(risk_days(&p).unwrap(), POOL16_ONE_RETEST * d / 0.85, 1e-7);
        }
    }

    #[test]
    fn test_custom_limits() {
        let p = params(1, 0);
        let narrow = WindowIntegrator::new(InfectivityModel::Continuous)
            .with_limits(IntegrationLimits {
                lower: -20.0,
                upper: 60.0,
            })
            .risk_days(&p)
            .unwrap();
        assert_relative(narrow, SINGLE_NO_RETEST, 1e-6);
        assert_eq!(
            WindowIntegrator::new(InfectivityModel::WorstCase).limits(),
            WORST_CASE_LIMITS
        );
    }
}
