//! Probability that a transfused volume carries enough virus to infect.

use serde::{Deserialize, Serialize};

use crate::growth::concentration;

/// Asymptote of the continuous copies model.
///
/// Kept at `1.000000000001` rather than `1.0`: reference outputs were produced
/// with this value and the integrand never reaches exactly zero because of it.
pub const INFECTIVITY_CEILING: f64 = 1.000000000001;

/// Copies at or above which the worst-case model treats a unit as infectious.
pub const WORST_CASE_MIN_COPIES: f64 = 2.0;

pub const DEFAULT_COPIES_PER_VIRION: f64 = 2.0;

/// Which dose-response curve maps copies to infection probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectivityModel {
    /// `1.000000000001 - exp(-k n)`.
    #[default]
    Continuous,
    /// Step at two copies, for bounding analysis.
    WorstCase,
}

impl InfectivityModel {
    pub fn prob_infectious_copies(self, n_copies: f64, k: f64) -> f64 {
        match self {
            InfectivityModel::Continuous => prob_infectious_copies(n_copies, k),
            InfectivityModel::WorstCase => prob_infectious_copies_wc(n_copies),
        }
    }
}

pub fn prob_infectious_copies(n_copies: f64, k: f64) -> f64 {
    INFECTIVITY_CEILING - (-k * n_copies).exp()
}

pub fn prob_infectious_copies_wc(n_copies: f64) -> f64 {
    if n_copies < WORST_CASE_MIN_COPIES {
        0.0
    } else {
        1.0
    }
}

/// Copies present in the transfused volume at time `t`.
pub fn transfused_copies(
    t: f64,
    c0: f64,
    doubling_time: f64,
    volume_transfused: f64,
    copies_per_virion: f64,
) -> f64 {
    concentration(c0, doubling_time, t) * copies_per_virion * volume_transfused
}

pub fn prob_infectious(
    t: f64,
    c0: f64,
    doubling_time: f64,
    volume_transfused: f64,
    k: f64,
    copies_per_virion: f64,
) -> f64 {
    let n_copies = transfused_copies(t, c0, doubling_time, volume_transfused, copies_per_virion);
    prob_infectious_copies(n_copies, k)
}

pub fn prob_infectious_wc(
    t: f64,
    c0: f64,
    doubling_time: f64,
    volume_transfused: f64,
    copies_per_virion: f64,
) -> f64 {
    let n_copies = transfused_copies(t, c0, doubling_time, volume_transfused, copies_per_virion);
    prob_infectious_copies_wc(n_copies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_copies_is_near_zero() {
        let p = prob_infectious_copies(0.0, 0.316);
        assert!(p > 0.0);
        assert!(p < 1e-11);
    }

    #[test]
    fn test_ceiling_is_preserved() {
        let p = prob_infectious_copies(1e6, 0.316);
        assert_eq!(p, INFECTIVITY_CEILING);
        assert!(p > 1.0);
    }

    #[test]
    fn test_increasing_in_copies_and_rate() {
        let copies = [0.01, 0.1, 1.0, 5.0, 20.0];
        for pair in copies.windows(2) {
            assert!(prob_infectious_copies(pair[1], 0.316) > prob_infectious_copies(pair[0], 0.316));
        }
        let rates = [0.01, 0.1, 0.316, 1.0];
        for pair in rates.windows(2) {
            assert!(prob_infectious_copies(2.0, pair[1]) > prob_infectious_copies(2.0, pair[0]));
        }
    }

    #[test]
    fn test_worst_case_step() {
        assert_eq!(prob_infectious_copies_wc(0.0), 0.0);
        assert_eq!(prob_infectious_copies_wc(1.999999), 0.0);
        assert_eq!(prob_infectious_copies_wc(2.0), 1.0);
        assert_eq!(prob_infectious_copies_wc(1e9), 1.0);
    }

    #[test]
    fn test_model_dispatch() {
        assert_eq!(
            InfectivityModel::Continuous.prob_infectious_copies(3.0, 0.2),
            prob_infectious_copies(3.0, 0.2)
        );
        assert_eq!(InfectivityModel::WorstCase.prob_infectious_copies(3.0, 0.2), 1.0);
    }

    #[test]
    fn test_composes_growth() {
        // 0.00025 * 2 * 20 = 0.01 copies at t = 0
        let p = prob_infectious(0.0, 0.00025, 0.85, 20.0, 0.316, DEFAULT_COPIES_PER_VIRION);
        let expected = INFECTIVITY_CEILING - f64::exp(-0.316 * 0.01);
        assert!(f64::abs(p - expected) < 1e-15);
        // 2 copies reached after log2(200) doubling times
        let t_two = 0.85 * f64::log2(200.0);
        assert_eq!(prob_infectious_wc(t_two - 0.01, 0.00025, 0.85, 20.0, 2.0), 0.0);
        assert_eq!(prob_infectious_wc(t_two + 0.01, 0.00025, 0.85, 20.0, 2.0), 1.0);
    }
}
